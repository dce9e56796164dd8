//! Cache backend contract
//!
//! A backend is a shared key-value store with per-entry TTL. Every call is
//! treated as independently atomic at the single-key level; nothing here
//! assumes in-process locking across calls.

use crate::errors::BackendError;
use async_trait::async_trait;
use serde_json::Value;

/// Key-value store consumed by the caching engine
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a live entry, `None` on miss
    async fn get(&self, key: &str) -> Result<Option<Value>, BackendError>;

    /// Store an entry, expiring after `ttl` seconds when given. A ttl of 0
    /// leaves no live entry behind.
    async fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<(), BackendError>;

    /// Delete an entry. A trailing `*` deletes every key with that prefix.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;

    /// Remove every entry
    async fn clear(&self) -> Result<(), BackendError>;

    /// Enumerate live keys
    async fn keys(&self) -> Result<Vec<String>, BackendError>;
}

/// Split a delete pattern into its prefix when it ends in a wildcard
pub(crate) fn wildcard_prefix(key: &str) -> Option<&str> {
    key.strip_suffix('*')
}
