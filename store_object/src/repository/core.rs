use super::call::RepositoryCall;
use super::transaction::RepositoryTransaction;
use crate::errors::RepositoryResult;
use crate::operation::{ModelOperation, Operation};
use crate::traits::decorator::run_chain;
use crate::traits::{DataClient, Next, OperationContext, OperationDecorator};
use cache_system::{CacheOptions, CachingOperations, FlushPattern};
use config::RepositoryConfig;
use futures::FutureExt;
use serde_json::{Value, json};
use std::sync::Arc;

/// What the terminal step of the chain hands to the client
pub(crate) enum Payload {
    Model(ModelOperation, Value),
    QueryRaw { query: String, params: Vec<Value> },
    ExecuteRaw { query: String, params: Vec<Value> },
}

/// Repository facade for one model
#[derive(Clone)]
pub struct Repository {
    pub(crate) client: Arc<dyn DataClient>,
    pub(crate) model: String,
    pub(crate) config: RepositoryConfig,
    pub(crate) cache: Option<CachingOperations>,
    pub(crate) decorators: Arc<[Arc<dyn OperationDecorator>]>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("model", &self.model)
            .field("has_cache", &self.is_cached())
            .field("soft_delete", &self.config.soft_delete)
            .field("timeout_ms", &self.config.timeout_ms)
            .field("decorators", &self.decorators.len())
            .finish()
    }
}

impl Repository {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Check if this repository caches reads
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub fn cache_operations(&self) -> Option<&CachingOperations> {
        self.cache.as_ref()
    }

    pub fn client(&self) -> &Arc<dyn DataClient> {
        &self.client
    }

    /// Handle for a single call with default behaviour
    pub fn call(&self) -> RepositoryCall<'_> {
        RepositoryCall::new(self)
    }

    /// Override caching for the next operation only
    pub fn cache(&self, options: CacheOptions) -> RepositoryCall<'_> {
        self.call().cache(options)
    }

    /// Bind the next operation to `transaction`
    pub fn trx(&self, transaction: &Arc<RepositoryTransaction>) -> RepositoryCall<'_> {
        self.call().trx(transaction)
    }

    /// Clear the whole cache backend. A no-op for uncached repositories.
    pub async fn flush_all(&self) -> RepositoryResult<()> {
        self.flush(FlushPattern::All).await
    }

    /// Drop every cached result of `operation` for this model
    pub async fn flush_operation(&self, operation: ModelOperation) -> RepositoryResult<()> {
        self.flush(FlushPattern::operation(operation.name())).await
    }

    /// Drop the cached result of one exact invocation
    pub async fn flush_exact(&self, operation: ModelOperation, args: Value) -> RepositoryResult<()> {
        self.flush(FlushPattern::exact(operation.name(), args)).await
    }

    pub async fn flush(&self, pattern: FlushPattern) -> RepositoryResult<()> {
        match &self.cache {
            Some(cache) => Ok(cache.flush(&pattern).await?),
            None => Ok(()),
        }
    }

    pub(crate) async fn dispatch(&self, ctx: OperationContext, payload: Payload) -> RepositoryResult<Value> {
        cache_system::debug_log!(
            "{}.{} (options: {:?}, in transaction: {})",
            ctx.model,
            ctx.operation,
            ctx.options,
            ctx.in_transaction()
        );

        let transaction = ctx.transaction.clone();
        let terminal: Next<'_> = Box::new(move || self.execute(transaction, payload).boxed());
        run_chain(&self.decorators, &ctx, terminal).await
    }

    async fn execute(
        &self,
        transaction: Option<Arc<RepositoryTransaction>>,
        payload: Payload,
    ) -> RepositoryResult<Value> {
        match transaction {
            Some(transaction) => self.execute_on(transaction.client().as_ref(), payload).await,
            None => self.execute_on(self.client.as_ref(), payload).await,
        }
    }

    async fn execute_on<C>(&self, client: &C, payload: Payload) -> RepositoryResult<Value>
    where
        C: DataClient + ?Sized,
    {
        match payload {
            Payload::Model(operation, args) => {
                let (operation, args) = self.soft_delete_rewrite(operation, args)?;
                client.run(&self.model, operation, args).await
            }
            Payload::QueryRaw { query, params } => client.query_raw(&query, &params).await,
            Payload::ExecuteRaw { query, params } => {
                let affected = client.execute_raw(&query, &params).await?;
                Ok(json!(affected))
            }
        }
    }

    pub(crate) fn context(
        &self,
        operation: Operation,
        args: Value,
        options: Option<CacheOptions>,
        transaction: Option<Arc<RepositoryTransaction>>,
    ) -> OperationContext {
        OperationContext {
            model: self.model.clone(),
            operation,
            args,
            options,
            transaction,
        }
    }
}
