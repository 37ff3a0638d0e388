use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use crate::{
    actions::{create_ingredient, create_tag, get_ingredient, list_tags},
    error::ServiceError,
    form::{IngredientForm, TagForm},
    jwt::SessionData,
    schema::{Id, Ingredient, Tag},
};

use super::cache::{CacheKeyType, CacheLifetime, RedisValue};

/// Tag catalog through the cache.
pub async fn cached_tags(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Tag>, ServiceError> {
    let pool = pool.clone();
    let value = RedisValue::get_or(CacheKeyType::Tag.new("all"), cache, || async move {
        list_tags(&pool).await
    })
    .await?;

    Ok(value.value)
}

pub async fn cached_ingredient(
    id: Id,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Ingredient, ServiceError> {
    let pool = pool.clone();
    let value = RedisValue::get_or_optional(CacheKeyType::Ingredient.new(id), cache, || async move {
        match get_ingredient(id, &pool).await {
            Ok(ingredient) => Ok(Some(ingredient)),
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    })
    .await?;

    value
        .map(|value| value.value)
        .ok_or_else(|| ServiceError::NotFound(format!("Ingredient {id} doesn't exist")))
}

pub async fn invalidate_cache(
    lifetime: CacheLifetime,
    cache: &mut MultiplexedConnection,
) -> Result<(), ServiceError> {
    lifetime.rotate(cache).await
}

/// Creates a tag and drops every cached tag entry.
pub async fn create_tag_cached(
    form: TagForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Tag, ServiceError> {
    let tag = create_tag(form, session, pool).await?;
    invalidate_cache(CacheLifetime::BindTagCache, cache).await?;

    Ok(tag)
}

pub async fn create_ingredient_cached(
    form: IngredientForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Ingredient, ServiceError> {
    let ingredient = create_ingredient(form, session, pool).await?;
    invalidate_cache(CacheLifetime::BindIngredientCache, cache).await?;

    Ok(ingredient)
}
