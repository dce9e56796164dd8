//! Core RepoHaus functionality
//!
//! This module contains the main RepoHaus struct and its implementation,
//! providing centralized coordination of the data client, the shared cache
//! backend and the repositories built on top of them.

use cache_system::{CacheBackend, CacheSettings, KeySanitizer, RedisBackend};
use config::{AppConfig, ConfigError};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use store_object::{DataClient, Repository, RepositoryBuilder};

use crate::errors::RepoHausError;

const HEALTH_CHECK_KEY: &str = "repohaus:health";

/// Main RepoHaus coordinator that owns the shared client, cache backend and repositories
pub struct RepoHaus {
    client: Arc<dyn DataClient>,
    config: AppConfig,
    cache_backend: Option<Arc<dyn CacheBackend>>,
    key_sanitizer: Option<KeySanitizer>,
    repositories: HashMap<String, Repository>,
}

impl std::fmt::Debug for RepoHaus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoHaus")
            .field("config", &self.config)
            .field("has_cache", &self.cache_backend.is_some())
            .field("repositories", &self.list_repositories())
            .finish()
    }
}

impl RepoHaus {
    /// Create a coordinator without a cache backend
    pub fn new(client: Arc<dyn DataClient>, config: AppConfig) -> Self {
        Self {
            client,
            config,
            cache_backend: None,
            key_sanitizer: None,
            repositories: HashMap::new(),
        }
    }

    /// Share `backend` between all repositories built from now on
    pub fn with_cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    pub fn with_key_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.key_sanitizer = Some(Arc::new(sanitizer));
        self
    }

    /// Connect to the Redis server from the `[redis]` config section and use it as the cache backend
    pub async fn connect_redis(&mut self) -> Result<(), RepoHausError> {
        let redis_config = self.config.redis.clone().ok_or_else(|| {
            ConfigError::Invalid("redis section is required to connect to Redis".to_string())
        })?;

        let backend = RedisBackend::new(redis_config)?;
        let pong = backend.ping().await?;
        tracing::info!(
            url = %backend.config().redis_url,
            prefix = %backend.config().key_prefix,
            "Connected to Redis ({})",
            pong
        );

        self.cache_backend = Some(Arc::new(backend));
        Ok(())
    }

    pub fn client(&self) -> &Arc<dyn DataClient> {
        &self.client
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache_backend(&self) -> Option<&Arc<dyn CacheBackend>> {
        self.cache_backend.as_ref()
    }

    /// Builder for a repository of `model`, pre-filled with this coordinator's
    /// client, configuration and cache backend
    pub fn repository(&self, model: &str) -> RepositoryBuilder {
        let builder = RepositoryBuilder::new(self.client.clone(), model).with_config(&self.config);

        match &self.cache_backend {
            Some(backend) => {
                let mut settings = CacheSettings::from(&self.config.cache);
                settings.key_sanitizer = self.key_sanitizer.clone();
                builder.with_cache(backend.clone(), settings)
            }
            None => builder,
        }
    }

    /// Register a repository under its model name
    pub fn register_repository(&mut self, repository: Repository) -> Result<(), RepoHausError> {
        let name = repository.model().to_string();
        if self.repositories.contains_key(&name) {
            return Err(RepoHausError::RepositoryAlreadyRegistered(name));
        }

        crate::debug_log!("Registered repository: {}", name);
        self.repositories.insert(name, repository);
        Ok(())
    }

    /// Get a registered repository by model name
    pub fn get_repository(&self, model: &str) -> Result<&Repository, RepoHausError> {
        self.repositories
            .get(model)
            .ok_or_else(|| RepoHausError::RepositoryNotFound(model.to_string()))
    }

    /// List all registered model names
    pub fn list_repositories(&self) -> Vec<&String> {
        let mut names: Vec<&String> = self.repositories.keys().collect();
        names.sort();
        names
    }

    /// Remove a repository by model name
    pub fn unregister_repository(&mut self, model: &str) -> Result<(), RepoHausError> {
        self.repositories
            .remove(model)
            .map(|_| ())
            .ok_or_else(|| RepoHausError::RepositoryNotFound(model.to_string()))
    }

    /// Round-trip a sample value through the cache backend
    pub async fn cache_health_check(&self) -> Result<(), RepoHausError> {
        let backend = self
            .cache_backend
            .as_ref()
            .ok_or(RepoHausError::NoCacheBackend)?;

        let sample = json!({ "ok": true });
        backend.set(HEALTH_CHECK_KEY, sample.clone(), Some(10)).await?;
        let read = backend.get(HEALTH_CHECK_KEY).await?;
        backend.delete(HEALTH_CHECK_KEY).await?;

        if read.as_ref() != Some(&sample) {
            return Err(RepoHausError::CacheBackend(
                cache_system::BackendError::Unavailable("health check value was not read back".to_string()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_system::MemoryBackend;
    use store_object::MemoryDataClient;

    fn haus() -> RepoHaus {
        RepoHaus::new(Arc::new(MemoryDataClient::new()), AppConfig::default())
    }

    #[test]
    fn test_register_and_lookup() {
        let mut haus = haus();
        let users = haus.repository("user").build().unwrap();
        haus.register_repository(users).unwrap();

        assert_eq!(haus.get_repository("user").unwrap().model(), "user");
        assert_eq!(haus.list_repositories(), vec!["user"]);

        let again = haus.repository("user").build().unwrap();
        assert!(matches!(
            haus.register_repository(again),
            Err(RepoHausError::RepositoryAlreadyRegistered(_))
        ));

        haus.unregister_repository("user").unwrap();
        assert!(matches!(
            haus.get_repository("user"),
            Err(RepoHausError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn test_repository_inherits_cache_backend() {
        let plain = haus().repository("user").build().unwrap();
        assert!(!plain.is_cached());

        let cached = haus()
            .with_cache_backend(Arc::new(MemoryBackend::new()))
            .repository("user")
            .build()
            .unwrap();
        assert!(cached.is_cached());
    }

    #[tokio::test]
    async fn test_cache_health_check() {
        assert!(matches!(
            haus().cache_health_check().await,
            Err(RepoHausError::NoCacheBackend)
        ));

        let backend = MemoryBackend::new();
        let haus = haus().with_cache_backend(Arc::new(backend.clone()));
        haus.cache_health_check().await.unwrap();
        assert!(backend.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connect_redis_requires_config() {
        let mut haus = haus();
        assert!(matches!(
            haus.connect_redis().await,
            Err(RepoHausError::Config(_))
        ));
    }
}
