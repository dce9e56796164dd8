use cache_system::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error in {model}.{operation}: {message}")]
    Database {
        model: String,
        operation: String,
        message: String,
    },

    #[error("Not found in {model}: {message}")]
    NotFound { model: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Transaction failed: {source}")]
    Transaction {
        #[source]
        source: Box<RepositoryError>,
    },

    #[error("Transaction already closed")]
    TransactionClosed,

    #[error("Soft delete is not enabled for {0}")]
    SoftDeleteDisabled(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl RepositoryError {
    pub fn database(model: &str, operation: &str, message: impl Into<String>) -> Self {
        Self::Database {
            model: model.to_string(),
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(model: &str, message: impl Into<String>) -> Self {
        Self::NotFound {
            model: model.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn transaction(source: RepositoryError) -> Self {
        Self::Transaction {
            source: Box::new(source),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
