//! Cache policy configuration
//!
//! [`CacheOptions`] is a per-call override, [`CacheSettings`] the defaults a
//! repository was built with. Resolution order is call option, then settings,
//! then the built-in fallback (caching on, one hour TTL).

use config::{CacheConfig, DEFAULT_TTL_SECONDS};
use std::fmt::Debug;
use std::sync::Arc;

/// Custom key transform. Returning `None` (or an empty string) selects the default transform.
pub type KeySanitizer = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Per-call cache override
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    pub cache: Option<bool>,
    pub ttl: Option<u64>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the cache for this call
    pub fn disabled() -> Self {
        Self {
            cache: Some(false),
            ttl: None,
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = Some(enabled);
        self
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Effective policy for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub enabled: bool,
    pub ttl: u64,
}

/// Cache defaults for a repository
#[derive(Clone, Default)]
pub struct CacheSettings {
    pub default_caching: Option<bool>,
    pub default_ttl: Option<u64>,
    pub key_sanitizer: Option<KeySanitizer>,
}

impl Debug for CacheSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSettings")
            .field("default_caching", &self.default_caching)
            .field("default_ttl", &self.default_ttl)
            .field("has_key_sanitizer", &self.key_sanitizer.is_some())
            .finish()
    }
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            default_caching: Some(config.default_caching),
            default_ttl: Some(config.default_ttl),
            key_sanitizer: None,
        }
    }
}

impl CacheSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_caching(mut self, enabled: bool) -> Self {
        self.default_caching = Some(enabled);
        self
    }

    pub fn with_default_ttl(mut self, ttl: u64) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    pub fn with_key_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.key_sanitizer = Some(Arc::new(sanitizer));
        self
    }

    /// Resolve a call's override against these defaults
    pub fn resolve(&self, options: Option<&CacheOptions>) -> CachePolicy {
        let enabled = options
            .and_then(|o| o.cache)
            .or(self.default_caching)
            .unwrap_or(true);
        let ttl = options
            .and_then(|o| o.ttl)
            .or(self.default_ttl)
            .unwrap_or(DEFAULT_TTL_SECONDS);

        CachePolicy { enabled, ttl }
    }
}
