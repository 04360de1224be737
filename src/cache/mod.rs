//! Cache layer
//!
//! In-process caching for hot, read-mostly data: the category catalog,
//! per-category form definitions and the landing page.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tripnest::cache::{create_cache, CacheLayer};
//! use tripnest::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default())?;
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

/// Cache layer trait
///
/// The generic methods make this trait unusable as a trait object, so
/// services hold the concrete [`Cache`] type.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration)
        -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values matching a glob pattern
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

pub use memory::MemoryCache;

/// Cache used by the services
pub type Cache = MemoryCache;

/// Create the shared cache from configuration
pub fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    if config.max_capacity == 0 {
        anyhow::bail!("cache.max_capacity must be greater than 0");
    }
    let ttl = Duration::from_secs(config.ttl_seconds);
    Ok(Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        ttl,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_cache() {
        let cache = create_cache(&CacheConfig::default()).unwrap();

        cache
            .set("test_key", &"test_value".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let result: Option<String> = cache.get("test_key").await.unwrap();
        assert_eq!(result, Some("test_value".to_string()));
    }

    #[tokio::test]
    async fn test_create_cache_rejects_zero_capacity() {
        let config = CacheConfig {
            ttl_seconds: 60,
            max_capacity: 0,
        };
        assert!(create_cache(&config).is_err());
    }
}
