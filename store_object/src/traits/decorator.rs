//! Operation decorators
//!
//! A repository runs every operation through an ordered chain of decorators.
//! Each decorator receives the call context and a continuation; it may run
//! the continuation, skip it, or wrap it.

use crate::errors::RepositoryResult;
use crate::operation::Operation;
use crate::repository::RepositoryTransaction;
use cache_system::CacheOptions;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// Continuation that runs the rest of the chain
pub type Next<'a> = Box<dyn FnOnce() -> BoxFuture<'a, RepositoryResult<Value>> + Send + 'a>;

/// One operation invocation as seen by decorators
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub model: String,
    pub operation: Operation,
    /// Arguments the cache key is derived from
    pub args: Value,
    /// Single-use cache override for this call
    pub options: Option<CacheOptions>,
    pub transaction: Option<Arc<RepositoryTransaction>>,
}

impl OperationContext {
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }
}

pub trait OperationDecorator: Send + Sync {
    fn around<'a>(
        &'a self,
        ctx: &'a OperationContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, RepositoryResult<Value>>;
}

/// Run `decorators` outermost first, ending in `terminal`
pub(crate) fn run_chain<'a>(
    decorators: &'a [Arc<dyn OperationDecorator>],
    ctx: &'a OperationContext,
    terminal: Next<'a>,
) -> BoxFuture<'a, RepositoryResult<Value>> {
    match decorators.split_first() {
        Some((outer, rest)) => outer.around(ctx, Box::new(move || run_chain(rest, ctx, terminal))),
        None => terminal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RepositoryError;
    use crate::operation::ModelOperation;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::Mutex;

    struct Tracer {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl OperationDecorator for Tracer {
        fn around<'a>(
            &'a self,
            _ctx: &'a OperationContext,
            next: Next<'a>,
        ) -> BoxFuture<'a, RepositoryResult<Value>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(format!("enter {}", self.name));
                let result = next().await;
                self.log.lock().unwrap().push(format!("exit {}", self.name));
                result
            })
        }
    }

    struct ShortCircuit;

    impl OperationDecorator for ShortCircuit {
        fn around<'a>(
            &'a self,
            _ctx: &'a OperationContext,
            _next: Next<'a>,
        ) -> BoxFuture<'a, RepositoryResult<Value>> {
            Box::pin(async { Ok(json!("short")) })
        }
    }

    fn context() -> OperationContext {
        OperationContext {
            model: "user".to_string(),
            operation: Operation::Model(ModelOperation::FindMany),
            args: json!({}),
            options: None,
            transaction: None,
        }
    }

    #[tokio::test]
    async fn test_chain_runs_outermost_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let decorators: Vec<Arc<dyn OperationDecorator>> = vec![
            Arc::new(Tracer { name: "outer", log: log.clone() }),
            Arc::new(Tracer { name: "inner", log: log.clone() }),
        ];
        let ctx = context();
        let terminal_log = log.clone();
        let terminal: Next<'_> = Box::new(move || {
            async move {
                terminal_log.lock().unwrap().push("terminal".to_string());
                Ok(json!(1))
            }
            .boxed()
        });

        let result = run_chain(&decorators, &ctx, terminal).await.unwrap();

        assert_eq!(result, json!(1));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter outer", "enter inner", "terminal", "exit inner", "exit outer"]
        );
    }

    #[tokio::test]
    async fn test_decorator_can_skip_terminal() {
        let decorators: Vec<Arc<dyn OperationDecorator>> = vec![Arc::new(ShortCircuit)];
        let ctx = context();
        let terminal: Next<'_> = Box::new(|| {
            async { Err(RepositoryError::Unsupported("terminal ran".to_string())) }.boxed()
        });

        assert_eq!(run_chain(&decorators, &ctx, terminal).await.unwrap(), json!("short"));
    }

    #[tokio::test]
    async fn test_empty_chain_is_terminal() {
        let ctx = context();
        let terminal: Next<'_> = Box::new(|| async { Ok(json!([])) }.boxed());
        assert_eq!(run_chain(&[], &ctx, terminal).await.unwrap(), json!([]));
    }
}
