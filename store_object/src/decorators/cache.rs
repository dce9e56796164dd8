//! Cache-aside decorator
//!
//! Reads consult the cache before the client and populate it on a miss.
//! Writes run first and then invalidate every key of the entity. Cache
//! failures never fail the operation: reads degrade to the client, failed
//! populates and invalidations are logged.
//!
//! Transaction-bound calls skip the cache. Their invalidation is deferred to
//! the transaction and runs only after a successful commit.

use crate::errors::RepositoryResult;
use crate::traits::{Next, OperationContext, OperationDecorator};
use cache_system::{CacheSettings, CachingOperations};
use futures::future::BoxFuture;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CacheDecorator {
    operations: CachingOperations,
    settings: CacheSettings,
}

impl CacheDecorator {
    pub fn new(operations: CachingOperations, settings: CacheSettings) -> Self {
        Self {
            operations,
            settings,
        }
    }

    pub fn operations(&self) -> &CachingOperations {
        &self.operations
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    async fn read_through(&self, ctx: &OperationContext, next: Next<'_>) -> RepositoryResult<Value> {
        let policy = self.settings.resolve(ctx.options.as_ref());
        if !policy.enabled || ctx.in_transaction() {
            cache_system::debug_log!(
                "Cache bypass for {}.{} (enabled: {}, in transaction: {})",
                ctx.model,
                ctx.operation,
                policy.enabled,
                ctx.in_transaction()
            );
            return next().await;
        }

        let key = match self.operations.key(ctx.operation.name(), &ctx.args) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(model = %ctx.model, operation = %ctx.operation, "Running uncached: {}", err);
                return next().await;
            }
        };

        if let Some(hit) = self.operations.get_key(&key).await.filter(|v| !v.is_null()) {
            return Ok(hit);
        }

        let result = next().await?;

        if !result.is_null() {
            if let Err(err) = self
                .operations
                .set_key(&key, result.clone(), Some(policy.ttl))
                .await
            {
                tracing::warn!(model = %ctx.model, operation = %ctx.operation, "{}", err);
            }
        }

        Ok(result)
    }

    async fn write_and_invalidate(&self, ctx: &OperationContext, next: Next<'_>) -> RepositoryResult<Value> {
        let result = next().await?;

        match &ctx.transaction {
            Some(transaction) => transaction.defer_invalidation(&self.operations),
            None => match self.operations.invalidate(None).await {
                Ok(deleted) => {
                    cache_system::debug_log!(
                        "Invalidated {} keys after {}.{}",
                        deleted,
                        ctx.model,
                        ctx.operation
                    );
                }
                Err(err) => {
                    tracing::error!(model = %ctx.model, operation = %ctx.operation, "{}", err);
                }
            },
        }

        Ok(result)
    }
}

impl OperationDecorator for CacheDecorator {
    fn around<'a>(
        &'a self,
        ctx: &'a OperationContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, RepositoryResult<Value>> {
        Box::pin(async move {
            if ctx.operation.is_read() {
                self.read_through(ctx, next).await
            } else {
                self.write_and_invalidate(ctx, next).await
            }
        })
    }
}
