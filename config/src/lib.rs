//! # Configuration Management for RepoHaus
//!
//! This crate provides centralized configuration structures for all RepoHaus components,
//! including cache defaults, repository behaviour and the optional Redis backend.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{AppConfig, CacheConfig, RepositoryConfig};
//!
//! let config = AppConfig {
//!     cache: CacheConfig::new(true, 600),
//!     repository: RepositoryConfig::new(true, 5000),
//!     redis: None,
//! };
//! assert_eq!(config.cache.default_ttl, 600);
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [cache]
//! default_caching = true
//! default_ttl = 3600
//!
//! [repository]
//! soft_delete = false
//! timeout_ms = 5000
//!
//! [redis]
//! redis_url = "redis://localhost:6379"
//! key_prefix = "repohaus"
//! connection_timeout_ms = 5000
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from $REPOHAUS_CONFIG, ./repohaus.toml or defaults
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./repohaus.toml";
const CONFIG_PATH_ENV: &str = "REPOHAUS_CONFIG";

/// Fallback TTL (seconds) when nothing else is configured
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Fallback per-operation and transaction timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
}

/// Global cache defaults applied when a call carries no override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub default_caching: bool,
    #[serde(default = "default_ttl")]
    pub default_ttl: u64,
}

/// Repository behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Rewrite deletes into `deletedAt` updates
    #[serde(default)]
    pub soft_delete: bool,
    /// Deadline for every operation and for whole transactions
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Redis cache backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    pub redis_url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_timeout_ms")]
    pub connection_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> u64 {
    DEFAULT_TTL_SECONDS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_key_prefix() -> String {
    "repohaus".to_string()
}

impl AppConfig {
    /// Load configuration from the TOML file named in the environment (or `.env`),
    /// then from the default path, falling back to built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is not an error
        let _ = dotenvy::dotenv();

        let config = if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            Self::from_file(&config_path)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.default_ttl == 0 {
            return Err(ConfigError::Invalid(
                "Cache default_ttl must be greater than 0".to_string(),
            ));
        }
        if self.repository.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Repository timeout_ms must be greater than 0".to_string(),
            ));
        }

        if let Some(redis) = &self.redis {
            if redis.redis_url.is_empty() {
                return Err(ConfigError::Invalid(
                    "Redis URL cannot be empty".to_string(),
                ));
            }
            if redis.key_prefix.is_empty() {
                return Err(ConfigError::Invalid(
                    "Redis key_prefix cannot be empty".to_string(),
                ));
            }
            if redis.connection_timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "Redis connection_timeout_ms must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new(default_caching: bool, default_ttl: u64) -> Self {
        Self {
            default_caching,
            default_ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_caching: true,
            default_ttl: DEFAULT_TTL_SECONDS,
        }
    }
}

impl RepositoryConfig {
    /// Create a new repository configuration
    pub fn new(soft_delete: bool, timeout_ms: u64) -> Self {
        Self {
            soft_delete,
            timeout_ms,
        }
    }

    /// Timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            soft_delete: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl RedisConfig {
    /// Create a new Redis configuration
    pub fn new(redis_url: String, key_prefix: String) -> Self {
        Self {
            redis_url,
            key_prefix,
            connection_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_connection_timeout(mut self, timeout_ms: u64) -> Self {
        self.connection_timeout_ms = timeout_ms;
        self
    }

    /// Connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert!(config.cache.default_caching);
        assert_eq!(config.cache.default_ttl, 3600);
        assert!(!config.repository.soft_delete);
        assert_eq!(config.repository.timeout_ms, 5000);
        assert!(config.redis.is_none());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [cache]
            default_ttl = 60

            [redis]
            redis_url = "redis://cache:6379"
            "#,
        )
        .unwrap();

        assert!(config.cache.default_caching);
        assert_eq!(config.cache.default_ttl, 60);
        let redis = config.redis.unwrap();
        assert_eq!(redis.key_prefix, "repohaus");
        assert_eq!(redis.connection_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let err = AppConfig::from_toml_str("[cache]\ndefault_ttl = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_empty_redis_url_rejected() {
        let err = AppConfig::from_toml_str("[redis]\nredis_url = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = AppConfig::from_toml_str("[cache\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
