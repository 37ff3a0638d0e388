use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{config::Config, error::ServiceError};

pub async fn connect_pool(config: &Config) -> Result<Pool<Postgres>, ServiceError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    log::info!(
        "Connected to database ({} connections max)",
        config.database_max_connections
    );
    Ok(pool)
}

/// Applies the bundled schema migrations.
pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), ServiceError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| ServiceError::Storage(format!("Migration failed: {e}")))?;

    Ok(())
}

pub async fn connect_cache(config: &Config) -> Result<MultiplexedConnection, ServiceError> {
    let client = redis::Client::open(config.redis_url.as_str())?;
    let connection = client.get_multiplexed_async_connection().await?;

    log::info!("Connected to cache");
    Ok(connection)
}
