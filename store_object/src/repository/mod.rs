//! Repository facade
//!
//! This module provides the repository type: per-model CRUD and raw
//! operations routed through a decorator chain, plus soft delete,
//! pagination and transaction helpers.

pub mod builder;
pub mod call;
pub mod core;
pub mod pagination;
pub mod soft_deletable;
pub mod transaction;

pub use builder::RepositoryBuilder;
pub use call::{BatchPayload, RepositoryCall};
pub use self::core::Repository;
pub use pagination::{DEFAULT_PAGE_SIZE, PaginatedResult, PaginationArgs, PaginationMeta};
pub use soft_deletable::SOFT_DELETE_FIELD;
pub use transaction::RepositoryTransaction;
