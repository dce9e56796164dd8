//! In-process cache backend
//!
//! Entries expire lazily: an expired entry is invisible to `get` and `keys`
//! and is dropped the next time it is touched.

use crate::backend::{CacheBackend, wildcard_prefix};
use crate::errors::BackendError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Hit/miss counters and live key count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: usize,
}

/// HashMap-backed cache with per-entry TTL
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of counters, pruning expired entries first
    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            keys: entries.len(),
        }
    }

    /// Remaining lifetime of an entry, `None` when absent or without expiry
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, BackendError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
            }
        }

        // Expired: drop it unless a concurrent set already replaced it
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<(), BackendError> {
        let expires_at = ttl.map(|secs| Instant::now() + Duration::from_secs(secs));
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let mut entries = self.entries.write().await;
        match wildcard_prefix(key) {
            Some(prefix) => entries.retain(|k, _| !k.starts_with(prefix)),
            None => {
                entries.remove(key);
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), BackendError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, BackendError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_set_roundtrip_counts_hits_and_misses() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("a").await.unwrap(), None);

        backend.set("a", json!({"id": 1}), Some(60)).await.unwrap();
        assert_eq!(backend.get("a").await.unwrap(), Some(json!({"id": 1})));

        let stats = backend.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.keys, 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let backend = MemoryBackend::new();
        backend.set("gone", json!(1), Some(0)).await.unwrap();

        assert_eq!(backend.get("gone").await.unwrap(), None);
        assert!(backend.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entry_without_ttl_never_expires() {
        let backend = MemoryBackend::new();
        backend.set("k", json!("v"), None).await.unwrap();
        assert_eq!(backend.ttl("k").await, None);
        assert_eq!(backend.get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_ttl_reports_remaining_lifetime() {
        let backend = MemoryBackend::new();
        backend.set("k", json!("v"), Some(60)).await.unwrap();
        let remaining = backend.ttl("k").await.unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(50));
    }

    #[tokio::test]
    async fn test_wildcard_delete_removes_prefix_only() {
        let backend = MemoryBackend::new();
        backend.set("user:1", json!(1), None).await.unwrap();
        backend.set("user:2", json!(2), None).await.unwrap();
        backend.set("post:1", json!(3), None).await.unwrap();

        backend.delete("user:*").await.unwrap();

        assert_eq!(backend.keys().await.unwrap(), vec!["post:1".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let backend = MemoryBackend::new();
        backend.set("a", json!(1), None).await.unwrap();
        backend.set("b", json!(2), None).await.unwrap();
        backend.clear().await.unwrap();
        assert!(backend.keys().await.unwrap().is_empty());
    }
}
