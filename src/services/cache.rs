use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache, L2 is Redis shared across instances.
/// Without Redis the manager serves from L1 alone.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager, falling back to L1-only if Redis is unreachable
    pub async fn new(redis_url: Option<&str>, l1_size: u64, ttl_secs: u64) -> Self {
        let redis = match redis_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => match Self::connect(url).await {
                Ok(conn) => Some(Arc::new(tokio::sync::Mutex::new(conn))),
                Err(e) => {
                    tracing::error!("Failed to connect to Redis ({}), running with in-process cache only", e);
                    None
                }
            },
            None => None,
        };

        Self {
            redis,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    /// In-process cache only
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    async fn connect(redis_url: &str) -> Result<ConnectionManager, CacheError> {
        let client = redis::Client::open(redis_url)?;
        Ok(ConnectionManager::new(client).await?)
    }

    fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
        moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);
                self.l1_cache
                    .insert(key.to_string(), json.as_bytes().to_vec())
                    .await;
                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (both L1 and L2)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let _: () = redis::cmd("DEL")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Drop every entry whose key starts with `prefix`
    pub async fn invalidate_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        // moka has no prefix scan; L1 entries are short-lived so clear it all
        self.l1_cache.invalidate_all();

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let keys: Vec<String> = redis::cmd("KEYS")
                .arg(format!("{}*", prefix))
                .query_async(&mut *conn)
                .await?;

            if !keys.is_empty() {
                let _: () = redis::cmd("DEL")
                    .arg(keys)
                    .query_async(&mut *conn)
                    .await?;
            }
        }

        tracing::debug!("Invalidated cache prefix: {}", prefix);
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            redis_enabled: self.redis.is_some(),
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub redis_enabled: bool,
    pub ttl_secs: u64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    pub const MODELS_PREFIX: &'static str = "models:";

    /// Roles granted to a user
    pub fn roles(user_id: &Uuid) -> String {
        format!("roles:{}", user_id)
    }

    /// A page of the model directory as one viewer sees it
    ///
    /// Rows come back filtered by the viewer's row-level policies, so the
    /// viewer is part of the key.
    pub fn models(viewer: &Uuid, query_string: &str) -> String {
        format!("{}{}:{}", Self::MODELS_PREFIX, viewer, query_string)
    }

    /// A single model card as one viewer sees it
    pub fn model(viewer: &Uuid, model_id: &Uuid) -> String {
        format!("{}{}:id:{}", Self::MODELS_PREFIX, viewer, model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_set_get_delete() {
        let cache = CacheManager::in_memory(100, 60);

        cache.set("k", &vec![1, 2, 3]).await.unwrap();
        let value: Vec<i32> = cache.get("k").await.unwrap();
        assert_eq!(value, vec![1, 2, 3]);

        cache.delete("k").await.unwrap();
        assert!(matches!(cache.get::<Vec<i32>>("k").await, Err(CacheError::CacheMiss(_))));
    }

    #[tokio::test]
    async fn test_empty_redis_url_is_l1_only() {
        let cache = CacheManager::new(Some(""), 10, 60).await;
        assert!(!cache.has_redis());
        assert!(!cache.stats().redis_enabled);
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_with_redis() {
        let cache = CacheManager::new(Some("redis://127.0.0.1:6379"), 1000, 60).await;
        assert!(cache.has_redis());

        cache.set("models:test", &"value").await.unwrap();
        cache.invalidate_prefix(CacheKey::MODELS_PREFIX).await.unwrap();
        assert!(cache.get::<String>("models:test").await.is_err());
    }

    #[test]
    fn test_cache_key_builder() {
        let id = Uuid::nil();
        assert_eq!(CacheKey::roles(&id), format!("roles:{}", id));
        assert_eq!(CacheKey::models(&id, "city=eq.x"), format!("models:{}:city=eq.x", id));
        assert!(CacheKey::model(&id, &Uuid::new_v4()).starts_with(CacheKey::MODELS_PREFIX));
        assert_ne!(CacheKey::model(&id, &Uuid::nil()), CacheKey::model(&Uuid::new_v4(), &Uuid::nil()));
    }
}
