use crate::errors::{RepositoryError, RepositoryResult};
use crate::traits::{Next, OperationContext, OperationDecorator};
use futures::future::BoxFuture;
use serde_json::Value;
use std::time::Duration;

/// Bounds the wall-clock time of the wrapped operation
#[derive(Debug, Clone, Copy)]
pub struct TimeoutDecorator {
    timeout: Duration,
}

impl TimeoutDecorator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl OperationDecorator for TimeoutDecorator {
    fn around<'a>(
        &'a self,
        ctx: &'a OperationContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, RepositoryResult<Value>> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, next()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        model = %ctx.model,
                        operation = %ctx.operation,
                        "Operation timed out after {:?}",
                        self.timeout
                    );
                    Err(RepositoryError::Timeout {
                        operation: format!("{}.{}", ctx.model, ctx.operation),
                        timeout_ms: self.timeout.as_millis() as u64,
                    })
                }
            }
        })
    }
}
