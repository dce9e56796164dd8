use super::core::Repository;
use crate::decorators::{CacheDecorator, TimeoutDecorator};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::traits::{DataClient, OperationDecorator};
use cache_system::{CacheBackend, CacheSettings, CachingOperations};
use config::{AppConfig, CacheConfig, RepositoryConfig};
use std::sync::Arc;

/// Assembles a [`Repository`] and its decorator chain.
///
/// The chain is, outermost first: the cache decorator (when a backend is
/// configured), any custom decorators in insertion order, then the timeout
/// decorator around the client call.
///
/// [`with_config`](Self::with_config) supplies the base configuration;
/// [`with_soft_delete`](Self::with_soft_delete) and
/// [`with_timeout`](Self::with_timeout) win over it regardless of call order.
pub struct RepositoryBuilder {
    client: Arc<dyn DataClient>,
    model: String,
    config: RepositoryConfig,
    soft_delete: Option<bool>,
    timeout_ms: Option<u64>,
    cache_defaults: Option<CacheConfig>,
    cache: Option<(Arc<dyn CacheBackend>, CacheSettings)>,
    decorators: Vec<Arc<dyn OperationDecorator>>,
}

impl std::fmt::Debug for RepositoryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryBuilder")
            .field("model", &self.model)
            .field("config", &self.config)
            .field("soft_delete", &self.soft_delete)
            .field("timeout_ms", &self.timeout_ms)
            .field("has_cache", &self.cache.is_some())
            .field("decorators", &self.decorators.len())
            .finish()
    }
}

impl RepositoryBuilder {
    pub fn new(client: Arc<dyn DataClient>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            config: RepositoryConfig::default(),
            soft_delete: None,
            timeout_ms: None,
            cache_defaults: None,
            cache: None,
            decorators: Vec::new(),
        }
    }

    /// Cache reads in `backend`. Unset fields of `settings` fall back to the
    /// cache section of [`with_config`](Self::with_config).
    pub fn with_cache(mut self, backend: Arc<dyn CacheBackend>, settings: CacheSettings) -> Self {
        self.cache = Some((backend, settings));
        self
    }

    pub fn with_soft_delete(mut self, enabled: bool) -> Self {
        self.soft_delete = Some(enabled);
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.config = config.repository.clone();
        self.cache_defaults = Some(config.cache.clone());
        self
    }

    pub fn with_decorator(mut self, decorator: Arc<dyn OperationDecorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn build(mut self) -> RepositoryResult<Repository> {
        if let Some(enabled) = self.soft_delete {
            self.config.soft_delete = enabled;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            self.config.timeout_ms = timeout_ms;
        }

        if self.model.trim().is_empty() {
            return Err(RepositoryError::Validation(
                "repository model name must not be empty".to_string(),
            ));
        }
        if self.config.timeout_ms == 0 {
            return Err(RepositoryError::Validation(
                "repository timeout must be greater than 0".to_string(),
            ));
        }

        let mut chain: Vec<Arc<dyn OperationDecorator>> = Vec::with_capacity(self.decorators.len() + 2);

        let cache = match self.cache {
            Some((backend, mut settings)) => {
                if let Some(defaults) = &self.cache_defaults {
                    settings.default_caching = settings.default_caching.or(Some(defaults.default_caching));
                    settings.default_ttl = settings.default_ttl.or(Some(defaults.default_ttl));
                }
                let operations = CachingOperations::new(backend, &self.model, settings.key_sanitizer.clone());
                chain.push(Arc::new(CacheDecorator::new(operations.clone(), settings)));
                Some(operations)
            }
            None => None,
        };

        chain.extend(self.decorators);
        chain.push(Arc::new(TimeoutDecorator::new(self.config.timeout())));

        tracing::info!(
            model = %self.model,
            cached = cache.is_some(),
            soft_delete = self.config.soft_delete,
            "Repository built"
        );

        Ok(Repository {
            client: self.client,
            model: self.model,
            config: self.config,
            cache,
            decorators: chain.into(),
        })
    }
}
