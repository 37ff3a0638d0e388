use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, ServiceError};

// Caching - keys

#[derive(Clone, Debug)]
pub struct CacheKey<T: ToString> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }

    pub fn lifetime(&self) -> CacheLifetime {
        match self._type {
            CacheKeyType::Tag => CacheLifetime::BindTagCache,
            CacheKeyType::Ingredient => CacheLifetime::BindIngredientCache,
        }
    }
}

impl<T: ToString> std::fmt::Display for CacheKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self._type {
            CacheKeyType::Tag => write!(f, "tag-{}", self._value.to_string()),
            CacheKeyType::Ingredient => write!(f, "ingredient-{}", self._value.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKeyType {
    Tag,
    Ingredient,
}

impl CacheKeyType {
    pub fn new<T: ToString>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

// Cache - wrappers

/// Entries remember the bind value current at write time; rotating the bind invalidates
/// every entry of that lifetime at once.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheLifetime {
    BindTagCache,
    BindIngredientCache,
}

impl CacheLifetime {
    pub fn bind_key(&self) -> &'static str {
        match self {
            CacheLifetime::BindTagCache => "tag-cache-key",
            CacheLifetime::BindIngredientCache => "ingredient-cache-key",
        }
    }

    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, ServiceError> {
        get_cache_value::<&str, String>(self.bind_key(), cache).await
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, ServiceError> {
        Ok(bind == &self.get_cache_bind(cache).await?)
    }

    pub async fn rotate(&self, cache: &mut MultiplexedConnection) -> Result<(), ServiceError> {
        let bind = uuid::Uuid::new_v4().to_string();
        log::trace!("> Rotating {} to {}", self.bind_key(), bind);
        set_cache_value(self.bind_key(), bind, cache).await
    }
}

#[derive(Serialize, serde::Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: serde::Serialize + Send + Sync + Clone> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>> RedisValue<T> {
    async fn new(
        value: T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, ServiceError> {
        let bind = lifetime.get_cache_bind(cache).await?;

        Ok(Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        })
    }

    async fn validate(&self, cache: &mut MultiplexedConnection) -> Result<bool, ServiceError> {
        self._lifetime.validate_cache_bind(&self._bind, cache).await
    }

    /// Returns the cached entry when its bind is still current.
    async fn lookup<K: ToString>(
        key: &CacheKey<K>,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<Self>, ServiceError> {
        let value = get_cache_value::<String, RedisValue<T>>(key.to_string(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });

        // * Cannot use .map(|| {...}) due to async closures
        match value {
            Some(value) => {
                log::trace!("> Found {}", key);
                match value.validate(cache).await? {
                    true => Ok(Some(value)),
                    false => {
                        log::trace!("> Invalidated {}", key);
                        Ok(None)
                    }
                }
            }
            None => Ok(None),
        }
    }

    async fn store<K: ToString>(
        key: &CacheKey<K>,
        value: T,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, ServiceError> {
        let value = RedisValue::new(value, key.lifetime(), cache).await?;

        if let Err(e) =
            set_cache_value::<String, RedisValue<T>>(key.to_string(), value.clone(), cache).await
        {
            log::error!("{e:?}");
        }

        Ok(value)
    }

    pub async fn get_or_optional<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<Option<RedisValue<T>>, ServiceError>
    where
        K: ToString,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, ServiceError>>,
    {
        if let Some(value) = Self::lookup(&key, cache).await? {
            return Ok(Some(value));
        }

        log::trace!("> Fetching {}", key);
        match callback().await? {
            Some(value) => Ok(Some(Self::store(&key, value, cache).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_or<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<T>, ServiceError>
    where
        K: ToString,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        if let Some(value) = Self::lookup(&key, cache).await? {
            return Ok(value);
        }

        log::trace!("> Fetching {}", key);
        let value = callback().await?;
        Self::store(&key, value, cache).await
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), ServiceError> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), ServiceError> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, ServiceError> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}
