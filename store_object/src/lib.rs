//! Store Object - Repository layer for RepoHaus
//!
//! This crate provides the data client contract, an in-memory client, the
//! operation decorator chain and the repository facade built on top of them.

pub mod decorators;
pub mod errors;
pub mod memory_client;
pub mod operation;
pub mod prelude;
pub mod repository;
pub mod traits;

pub use decorators::{CacheDecorator, TimeoutDecorator};
pub use errors::{RepositoryError, RepositoryResult};
pub use memory_client::{MemoryDataClient, MemoryTransaction, RawHandler};
pub use operation::{ModelOperation, Operation, RAW_EXECUTE_OPERATION};
pub use repository::{
    BatchPayload, PaginatedResult, PaginationArgs, PaginationMeta, Repository, RepositoryBuilder,
    RepositoryCall, RepositoryTransaction, SOFT_DELETE_FIELD,
};
pub use traits::{DataClient, Next, OperationContext, OperationDecorator, TransactionClient};
