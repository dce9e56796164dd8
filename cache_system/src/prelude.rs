//! Convenience re-exports for common cache-system usage

// Core cache system components
pub use crate::backend::CacheBackend;
pub use crate::errors::{BackendError, CacheError};
pub use crate::memory::{CacheStats, MemoryBackend};
pub use crate::operations::{CachingOperations, FlushPattern};
pub use crate::options::{CacheOptions, CacheSettings, KeySanitizer};
pub use crate::redis_backend::RedisBackend;

// Re-export centralized config
pub use config::{CacheConfig, RedisConfig};

// Common external dependencies
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;
