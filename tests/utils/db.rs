/// Database and cache access for integration tests.
///
/// Tests skip themselves when `DATABASE_URL` (or `REDIS_URL` for cache tests) is not set so
/// the unit suite runs anywhere. Under `CI` a missing variable fails the test instead.
use foodgram_sdk::{connection::run_migrations, media::image::MediaStorage};
use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

fn test_var(key: &str) -> Option<String> {
    dotenvy::dotenv().ok();
    match std::env::var(key) {
        Ok(value) => Some(value),
        Err(_) if std::env::var_os("CI").is_some() => {
            panic!("{key} must be set when CI is set")
        }
        Err(_) => {
            eprintln!("{key} not set, skipping");
            None
        }
    }
}

pub async fn test_pool() -> Option<Pool<Postgres>> {
    let url = test_var("DATABASE_URL")?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("test database should be reachable");
    run_migrations(&pool).await.expect("migrations should apply");

    Some(pool)
}

pub async fn test_cache() -> Option<MultiplexedConnection> {
    let url = test_var("REDIS_URL")?;

    let client = redis::Client::open(url.as_str()).expect("REDIS_URL should parse");
    let connection = client
        .get_multiplexed_async_connection()
        .await
        .expect("test cache should be reachable");

    Some(connection)
}

pub fn test_media() -> MediaStorage {
    MediaStorage::new(std::env::temp_dir().join(format!("foodgram-it-{}", uuid::Uuid::new_v4())))
}
