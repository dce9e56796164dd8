//! # RepoHaus
//!
//! A repository facade over an async data client with cache-aside read
//! caching, write invalidation, soft delete and bounded transactions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use repohaus::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = Arc::new(MemoryDataClient::new());
//!
//!     let mut haus = RepoHaus::new(client, config)
//!         .with_cache_backend(Arc::new(MemoryBackend::new()));
//!
//!     let users = haus.repository("user").build()?;
//!     haus.register_repository(users)?;
//!     let users = haus.get_repository("user")?;
//!
//!     users
//!         .create(json!({"data": {"email": "john@example.com", "name": "John"}}))
//!         .await?;
//!
//!     // Served by the client, then cached
//!     let john = users
//!         .find_unique(json!({"where": {"email": "john@example.com"}}))
//!         .await?;
//!     println!("Found: {:?}", john);
//!
//!     // Skip the cache for one call
//!     let fresh = users
//!         .cache(CacheOptions::disabled())
//!         .count(json!({}))
//!         .await?;
//!     println!("{} users", fresh);
//!
//!     Ok(())
//! }
//! ```

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

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use self::core::RepoHaus;
pub use errors::RepoHausError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, RedisConfig, RepositoryConfig};

// Re-export internal crates used by the public API
pub use cache_system;
pub use store_object;

// Re-export external dependencies used in public API
pub use async_trait;
