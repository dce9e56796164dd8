//! Error types for cache operations
//!
//! Backends report raw failures as [`BackendError`]. The operations engine
//! classifies them into [`CacheError`] by the path they happened on, so the
//! repository layer can decide which ones to swallow and which to surface.

use thiserror::Error;

/// Raw failure reported by a cache backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection timeout after {0}ms")]
    Timeout(u64),

    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Cache system errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Arguments could not be serialized into a key
    #[error("Failed to encode cache key for {operation}: {source}")]
    KeyEncoding {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cache read failed for key {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: BackendError,
    },

    #[error("Cache write failed for key {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: BackendError,
    },

    #[error("Cache invalidation failed ({target}): {source}")]
    Invalidation {
        target: String,
        #[source]
        source: BackendError,
    },

    /// An explicitly requested flush did not complete
    #[error("Failed to flush cache ({pattern}): {source}")]
    Flush {
        pattern: String,
        #[source]
        source: Box<CacheError>,
    },

    #[error("Cache backend error: {0}")]
    Backend(#[from] BackendError),
}

impl CacheError {
    pub(crate) fn flush(pattern: impl Into<String>, source: CacheError) -> Self {
        CacheError::Flush {
            pattern: pattern.into(),
            source: Box::new(source),
        }
    }
}
