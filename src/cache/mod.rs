//! Key-value cache layer.
//!
//! Defines the [`CacheStore`] contract the core depends on, the key
//! namespacing shared with other consumers of the same backing store, and an
//! in-memory TTL implementation used by tests and single-process deployments.
//!
//! Cache failures are never fatal for read paths: callers treat an error as a
//! miss and fall back to the persistent store. The rate limiter goes one step
//! further and fails open.

use crate::errors::{Result, SecureShareError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

pub mod keys;

/// Contract for the remote key-value cache.
///
/// All operations may fail; except for rate limiting (which fails open),
/// callers must treat failure as equivalent to a miss/no-op rather than
/// propagating it.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Atomically increment the counter at `key`, creating it at 1
    async fn increment(&self, key: &str) -> Result<i64>;
    /// Set the remaining TTL for `key`; no-op when the key is absent
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>>;
}

/// Cached entry with an optional expiration deadline
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }
}

/// In-memory [`CacheStore`] with lazy TTL expiry.
///
/// Entries are checked against their deadline on read and purged on write.
/// A remote store (e.g. Redis) would implement the same trait; none is
/// bundled with the core.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Remove expired entries (maintenance)
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut cache = self.inner.write().await;
        cache.retain(|key, entry| {
            let expired = entry.is_expired(now);
            if expired {
                debug!(key = %key, "Removing expired cache entry");
            }
            !expired
        });
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.inner.read().await.values().filter(|entry| !entry.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Clone for MemoryCacheStore {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let cache = self.inner.read().await;
        Ok(cache.get(key).filter(|entry| !entry.is_expired(now)).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut cache = self.inner.write().await;
        cache.insert(
            key.to_string(),
            CacheEntry { value: value.to_string(), expires_at: Some(Instant::now() + ttl) },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut cache = self.inner.write().await;
        cache.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        let mut cache = self.inner.write().await;

        match cache.get_mut(key).filter(|entry| !entry.is_expired(now)) {
            Some(entry) => {
                let count: i64 = entry.value.parse().map_err(|_| {
                    SecureShareError::cache(format!("Value at '{}' is not a counter", key))
                })?;
                let next = count + 1;
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                // Fresh counter with no deadline until the caller sets one
                cache.insert(key.to_string(), CacheEntry { value: "1".to_string(), expires_at: None });
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut cache = self.inner.write().await;
        if let Some(entry) = cache.get_mut(key).filter(|entry| !entry.is_expired(now)) {
            entry.expires_at = Some(now + ttl);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let cache = self.inner.read().await;
        Ok(cache.get(key).is_some_and(|entry| !entry.is_expired(now)))
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let now = Instant::now();
        let cache = self.inner.read().await;
        Ok(keys
            .iter()
            .map(|key| {
                cache.get(key).filter(|entry| !entry.is_expired(now)).map(|entry| entry.value.clone())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCacheStore::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        assert!(cache.exists("k").await.unwrap());
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = MemoryCacheStore::new();
        cache.set("k", "v", Duration::from_millis(40)).await.unwrap();

        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(!cache.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCacheStore::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_increment_starts_at_one_and_counts_up() {
        let cache = MemoryCacheStore::new();
        assert_eq!(cache.increment("counter").await.unwrap(), 1);
        assert_eq!(cache.increment("counter").await.unwrap(), 2);
        assert_eq!(cache.increment("counter").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_expired_counter_restarts() {
        let cache = MemoryCacheStore::new();
        assert_eq!(cache.increment("counter").await.unwrap(), 1);
        cache.expire("counter", Duration::from_millis(40)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        // Window elapsed: the next increment opens a fresh one
        assert_eq!(cache.increment("counter").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_increment_rejects_non_counter_value() {
        let cache = MemoryCacheStore::new();
        cache.set("k", "not-a-number", Duration::from_secs(60)).await.unwrap();
        assert!(cache.increment("k").await.is_err());
    }

    #[tokio::test]
    async fn test_multi_get_preserves_order() {
        let cache = MemoryCacheStore::new();
        cache.set("a", "1", Duration::from_secs(60)).await.unwrap();
        cache.set("c", "3", Duration::from_secs(60)).await.unwrap();

        let values = cache
            .multi_get(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![Some("1".to_string()), None, Some("3".to_string())]);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let cache = MemoryCacheStore::new();
        cache.set("short", "v", Duration::from_millis(40)).await.unwrap();
        cache.set("long", "v", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.cleanup_expired().await;

        assert_eq!(cache.len().await, 1);
        assert!(cache.exists("long").await.unwrap());
    }
}
