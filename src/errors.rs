//! Error types for the RepoHaus crate
//!
//! This module contains the errors returned by the [`RepoHaus`](crate::RepoHaus) coordinator.

use cache_system::BackendError;
use config::ConfigError;
use store_object::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoHausError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache backend error: {0}")]
    CacheBackend(#[from] BackendError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Repository already registered: {0}")]
    RepositoryAlreadyRegistered(String),

    #[error("No cache backend configured")]
    NoCacheBackend,
}
