//! Transaction support for Repository
//!
//! A [`RepositoryTransaction`] wraps a client transaction and collects the
//! cache invalidations owed by writes bound to it. They are applied after a
//! successful commit and discarded on rollback, so the shared cache never
//! reflects uncommitted writes.
//!
//! # Example
//! ```ignore
//! let moved = users
//!     .transaction(
//!         |tx| async move {
//!             users.trx(&tx).update(json!({"where": {"id": 1}, "data": {"team": "b"}})).await?;
//!             teams.trx(&tx).update(json!({"where": {"id": "b"}, "data": {"size": {"increment": 1}}})).await
//!         },
//!         None,
//!     )
//!     .await?;
//! ```

use super::core::Repository;
use crate::errors::{RepositoryError, RepositoryResult};
use crate::traits::TransactionClient;
use cache_system::CachingOperations;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct RepositoryTransaction {
    client: Arc<dyn TransactionClient>,
    pending_invalidations: Mutex<HashMap<String, CachingOperations>>,
}

impl std::fmt::Debug for RepositoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryTransaction")
            .field("pending_invalidations", &self.pending_entities())
            .finish()
    }
}

impl RepositoryTransaction {
    pub fn new(client: Arc<dyn TransactionClient>) -> Self {
        Self {
            client,
            pending_invalidations: Mutex::new(HashMap::new()),
        }
    }

    /// Client operations bound to this transaction run on
    pub fn client(&self) -> &Arc<dyn TransactionClient> {
        &self.client
    }

    /// Entities whose cache will be invalidated on commit
    pub fn pending_entities(&self) -> Vec<String> {
        match self.pending_invalidations.lock() {
            Ok(pending) => {
                let mut entities: Vec<String> = pending.keys().cloned().collect();
                entities.sort();
                entities
            }
            Err(_) => Vec::new(),
        }
    }

    pub(crate) fn defer_invalidation(&self, operations: &CachingOperations) {
        if let Ok(mut pending) = self.pending_invalidations.lock() {
            pending
                .entry(operations.codec().entity().to_string())
                .or_insert_with(|| operations.clone());
        }
    }

    fn take_invalidations(&self) -> Vec<CachingOperations> {
        match self.pending_invalidations.lock() {
            Ok(mut pending) => pending.drain().map(|(_, operations)| operations).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Commit, then invalidate the cache of every entity written in the transaction
    pub async fn commit(&self) -> RepositoryResult<()> {
        self.client.commit().await?;

        for operations in self.take_invalidations() {
            if let Err(err) = operations.invalidate(None).await {
                tracing::error!(entity = %operations.codec().entity(), "Post-commit invalidation failed: {}", err);
            }
        }
        Ok(())
    }

    /// Roll back and forget pending invalidations
    pub async fn rollback(&self) -> RepositoryResult<()> {
        self.take_invalidations();
        self.client.rollback().await
    }
}

impl Repository {
    /// Begin a new client transaction
    pub async fn begin_transaction(&self) -> RepositoryResult<Arc<RepositoryTransaction>> {
        let client = self.client.begin().await?;
        Ok(Arc::new(RepositoryTransaction::new(client)))
    }

    /// Run `body` in a transaction bounded by `timeout` (the repository's
    /// configured timeout when `None`). Commits when `body` succeeds and
    /// rolls back when it fails or runs out of time.
    pub async fn transaction<F, Fut, T>(&self, body: F, timeout: Option<Duration>) -> RepositoryResult<T>
    where
        F: FnOnce(Arc<RepositoryTransaction>) -> Fut,
        Fut: Future<Output = RepositoryResult<T>>,
    {
        let timeout = timeout.unwrap_or_else(|| self.config.timeout());
        let transaction = self
            .begin_transaction()
            .await
            .map_err(RepositoryError::transaction)?;

        match tokio::time::timeout(timeout, body(transaction.clone())).await {
            Ok(Ok(value)) => {
                transaction
                    .commit()
                    .await
                    .map_err(RepositoryError::transaction)?;
                Ok(value)
            }
            Ok(Err(err)) => {
                self.abandon(&transaction).await;
                Err(RepositoryError::transaction(err))
            }
            Err(_) => {
                self.abandon(&transaction).await;
                tracing::warn!(model = %self.model, "Transaction timed out after {:?}", timeout);
                Err(RepositoryError::transaction(RepositoryError::Timeout {
                    operation: "$transaction".to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }))
            }
        }
    }

    async fn abandon(&self, transaction: &RepositoryTransaction) {
        if let Err(err) = transaction.rollback().await {
            tracing::error!(model = %self.model, "Rollback failed: {}", err);
        }
    }
}
