//! Convenience re-exports for common RepoHaus usage
//!
//! This prelude module re-exports the most commonly used items from the RepoHaus crates,
//! making it easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use repohaus::prelude::*;
//!
//! let options = CacheOptions::new().with_ttl(60);
//! assert_eq!(options.ttl, Some(60));
//! ```

// Core RepoHaus components
pub use crate::core::RepoHaus;
pub use crate::errors::RepoHausError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, RedisConfig, RepositoryConfig};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Re-export cache system
pub use cache_system::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use tokio;
