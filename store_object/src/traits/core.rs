//! Data client contract
//!
//! The repository never generates queries itself. It forwards operation
//! arguments to an implementation of [`DataClient`] and only interprets the
//! shape of the result.

use crate::errors::RepositoryResult;
use crate::operation::ModelOperation;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Underlying data client shared by all repositories
#[async_trait]
pub trait DataClient: Send + Sync {
    /// Run a model operation with client-native arguments
    async fn run(&self, model: &str, operation: ModelOperation, args: Value) -> RepositoryResult<Value>;

    /// Execute a raw statement, returning the affected row count
    async fn execute_raw(&self, query: &str, params: &[Value]) -> RepositoryResult<u64>;

    /// Run a raw query, returning its rows
    async fn query_raw(&self, query: &str, params: &[Value]) -> RepositoryResult<Value>;

    /// Open an interactive transaction
    async fn begin(&self) -> RepositoryResult<Arc<dyn TransactionClient>>;
}

/// Transaction-scoped client. Operations run through it see the transaction's
/// uncommitted state.
#[async_trait]
pub trait TransactionClient: DataClient {
    async fn commit(&self) -> RepositoryResult<()>;

    async fn rollback(&self) -> RepositoryResult<()>;
}
