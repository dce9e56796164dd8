//! Single-use call handle
//!
//! `repo.cache(..)` and `repo.trx(..)` return a [`RepositoryCall`] carrying the
//! override or binding for exactly one operation. Every operation consumes the
//! handle, so the next call on the repository starts from the defaults again.

use super::core::{Payload, Repository};
use super::transaction::RepositoryTransaction;
use crate::errors::{RepositoryError, RepositoryResult};
use crate::operation::{ModelOperation, Operation};
use cache_system::{CacheOptions, CachingOperations};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result of batch writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPayload {
    pub count: u64,
}

#[must_use = "a call handle does nothing until an operation is run on it"]
pub struct RepositoryCall<'r> {
    repository: &'r Repository,
    options: Option<CacheOptions>,
    transaction: Option<Arc<RepositoryTransaction>>,
}

impl<'r> RepositoryCall<'r> {
    pub(crate) fn new(repository: &'r Repository) -> Self {
        Self {
            repository,
            options: None,
            transaction: None,
        }
    }

    pub fn cache(mut self, options: CacheOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn trx(mut self, transaction: &Arc<RepositoryTransaction>) -> Self {
        self.transaction = Some(transaction.clone());
        self
    }

    async fn run(self, operation: ModelOperation, args: Value) -> RepositoryResult<Value> {
        let ctx = self.repository.context(
            Operation::Model(operation),
            args.clone(),
            self.options,
            self.transaction,
        );
        self.repository
            .dispatch(ctx, Payload::Model(operation, args))
            .await
    }

    pub async fn create(self, args: Value) -> RepositoryResult<Value> {
        self.run(ModelOperation::Create, args).await
    }

    pub async fn create_many(self, args: Value) -> RepositoryResult<BatchPayload> {
        batch(self.run(ModelOperation::CreateMany, args).await?)
    }

    pub async fn find_many(self, args: Value) -> RepositoryResult<Vec<Value>> {
        match self.run(ModelOperation::FindMany, args).await? {
            Value::Null => Ok(Vec::new()),
            value => Ok(serde_json::from_value(value)?),
        }
    }

    pub async fn find_first(self, args: Value) -> RepositoryResult<Option<Value>> {
        Ok(optional(self.run(ModelOperation::FindFirst, args).await?))
    }

    pub async fn find_unique(self, args: Value) -> RepositoryResult<Option<Value>> {
        Ok(optional(self.run(ModelOperation::FindUnique, args).await?))
    }

    pub async fn update(self, args: Value) -> RepositoryResult<Value> {
        self.run(ModelOperation::Update, args).await
    }

    pub async fn update_many(self, args: Value) -> RepositoryResult<BatchPayload> {
        batch(self.run(ModelOperation::UpdateMany, args).await?)
    }

    pub async fn delete(self, args: Value) -> RepositoryResult<Value> {
        self.run(ModelOperation::Delete, args).await
    }

    pub async fn delete_many(self, args: Value) -> RepositoryResult<BatchPayload> {
        batch(self.run(ModelOperation::DeleteMany, args).await?)
    }

    pub async fn upsert(self, args: Value) -> RepositoryResult<Value> {
        self.run(ModelOperation::Upsert, args).await
    }

    pub async fn count(self, args: Value) -> RepositoryResult<u64> {
        let value = self.run(ModelOperation::Count, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Raw read, cached under `$queryRaw` with whitespace-normalized text
    pub async fn query_raw(self, query: &str, params: &[Value]) -> RepositoryResult<Value> {
        let ctx = self.repository.context(
            Operation::QueryRaw,
            CachingOperations::raw_args(query, params),
            self.options,
            self.transaction,
        );
        let payload = Payload::QueryRaw {
            query: query.to_string(),
            params: params.to_vec(),
        };
        self.repository.dispatch(ctx, payload).await
    }

    /// Raw statement; invalidates like any other write
    pub async fn execute_raw(self, query: &str, params: &[Value]) -> RepositoryResult<u64> {
        let ctx = self.repository.context(
            Operation::ExecuteRaw,
            CachingOperations::raw_args(query, params),
            self.options,
            self.transaction,
        );
        let payload = Payload::ExecuteRaw {
            query: query.to_string(),
            params: params.to_vec(),
        };
        let affected = self.repository.dispatch(ctx, payload).await?;
        Ok(serde_json::from_value(affected)?)
    }
}

fn optional(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        value => Some(value),
    }
}

fn batch(value: Value) -> RepositoryResult<BatchPayload> {
    serde_json::from_value(value).map_err(RepositoryError::from)
}

impl Repository {
    pub async fn create(&self, args: Value) -> RepositoryResult<Value> {
        self.call().create(args).await
    }

    pub async fn create_many(&self, args: Value) -> RepositoryResult<BatchPayload> {
        self.call().create_many(args).await
    }

    pub async fn find_many(&self, args: Value) -> RepositoryResult<Vec<Value>> {
        self.call().find_many(args).await
    }

    pub async fn find_first(&self, args: Value) -> RepositoryResult<Option<Value>> {
        self.call().find_first(args).await
    }

    pub async fn find_unique(&self, args: Value) -> RepositoryResult<Option<Value>> {
        self.call().find_unique(args).await
    }

    pub async fn update(&self, args: Value) -> RepositoryResult<Value> {
        self.call().update(args).await
    }

    pub async fn update_many(&self, args: Value) -> RepositoryResult<BatchPayload> {
        self.call().update_many(args).await
    }

    pub async fn delete(&self, args: Value) -> RepositoryResult<Value> {
        self.call().delete(args).await
    }

    pub async fn delete_many(&self, args: Value) -> RepositoryResult<BatchPayload> {
        self.call().delete_many(args).await
    }

    pub async fn upsert(&self, args: Value) -> RepositoryResult<Value> {
        self.call().upsert(args).await
    }

    pub async fn count(&self, args: Value) -> RepositoryResult<u64> {
        self.call().count(args).await
    }

    pub async fn query_raw(&self, query: &str, params: &[Value]) -> RepositoryResult<Value> {
        self.call().query_raw(query, params).await
    }

    pub async fn execute_raw(&self, query: &str, params: &[Value]) -> RepositoryResult<u64> {
        self.call().execute_raw(query, params).await
    }
}
