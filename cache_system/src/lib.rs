//! Cache system for repository read caching
//!
//! This crate provides the cache backend contract with in-memory and Redis
//! implementations, deterministic cache-key encoding, and the caching
//! operations engine used by cached repositories.

/// Conditional debug logging macro
/// Only compiled in when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub mod backend;
pub mod codec;
pub mod errors;
pub mod memory;
pub mod operations;
pub mod options;
pub mod prelude;
pub mod redis_backend;

// Re-export centralized config
pub use config::{CacheConfig, RedisConfig};

pub use backend::CacheBackend;
pub use codec::{CacheKeyCodec, default_sanitize_key};
pub use errors::{BackendError, CacheError};
pub use memory::{CacheStats, MemoryBackend};
pub use operations::{CachingOperations, FlushPattern, RAW_QUERY_OPERATION};
pub use options::{CacheOptions, CachePolicy, CacheSettings, KeySanitizer};
pub use redis_backend::RedisBackend;
