//! Convenience re-exports for common store-object usage

// Core traits
pub use crate::traits::{DataClient, Next, OperationContext, OperationDecorator, TransactionClient};

// Error types
pub use crate::errors::{RepositoryError, RepositoryResult};

// Repository functionality
pub use crate::operation::{ModelOperation, Operation};
pub use crate::repository::{
    BatchPayload, PaginatedResult, PaginationArgs, PaginationMeta, Repository, RepositoryBuilder,
    RepositoryTransaction,
};

// In-memory client
pub use crate::memory_client::MemoryDataClient;

// Cache options (re-exported from cache_system)
pub use cache_system::{CacheOptions, CacheSettings, FlushPattern};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use serde_json::{Value, json};
