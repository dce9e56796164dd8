//! Caching operations engine
//!
//! Mid-level primitives over a [`CacheBackend`] for a single entity. Reads are
//! fail-open: a backend failure on `get` is logged and reported as a miss.
//! Writes, deletes and enumeration failures are classified into
//! [`CacheError`] variants and returned; callers decide whether to surface them.
//!
//! Invalidation enumerates keys and then deletes them. That is not atomic with
//! respect to concurrent `set`s, so a value written during an invalidation may
//! survive it until its TTL runs out.

use crate::backend::CacheBackend;
use crate::codec::{CacheKeyCodec, normalize_query};
use crate::errors::CacheError;
use crate::options::KeySanitizer;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Operation name raw read queries are cached under
pub const RAW_QUERY_OPERATION: &str = "$queryRaw";

/// What to remove from the cache
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FlushPattern {
    /// Every key in the backend
    #[default]
    All,
    /// Keys for this entity, narrowed by operation and then by exact arguments
    Selective {
        operation: Option<String>,
        args: Option<Value>,
    },
}

impl FlushPattern {
    /// Every key for the entity
    pub fn entity() -> Self {
        FlushPattern::Selective {
            operation: None,
            args: None,
        }
    }

    pub fn operation(operation: &str) -> Self {
        FlushPattern::Selective {
            operation: Some(operation.to_string()),
            args: None,
        }
    }

    pub fn exact(operation: &str, args: Value) -> Self {
        FlushPattern::Selective {
            operation: Some(operation.to_string()),
            args: Some(args),
        }
    }
}

impl fmt::Display for FlushPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushPattern::All => write!(f, "all"),
            FlushPattern::Selective {
                operation: Some(op),
                args: Some(_),
            } => write!(f, "exact:{}", op),
            FlushPattern::Selective {
                operation: Some(op),
                args: None,
            } => write!(f, "operation:{}", op),
            FlushPattern::Selective { operation: None, .. } => write!(f, "entity"),
        }
    }
}

/// Cache primitives bound to one entity
#[derive(Clone)]
pub struct CachingOperations {
    backend: Arc<dyn CacheBackend>,
    codec: CacheKeyCodec,
}

impl Debug for CachingOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingOperations")
            .field("codec", &self.codec)
            .finish()
    }
}

impl CachingOperations {
    pub fn new(backend: Arc<dyn CacheBackend>, entity: &str, sanitizer: Option<KeySanitizer>) -> Self {
        Self {
            backend,
            codec: CacheKeyCodec::new(entity, sanitizer),
        }
    }

    pub fn codec(&self) -> &CacheKeyCodec {
        &self.codec
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Encode the key for an operation invocation
    pub fn key<A>(&self, operation: &str, args: &A) -> Result<String, CacheError>
    where
        A: Serialize + ?Sized,
    {
        self.codec.encode(operation, args)
    }

    /// Look up a cached value. Only key encoding failures are returned as errors.
    pub async fn get<A>(&self, operation: &str, args: &A) -> Result<Option<Value>, CacheError>
    where
        A: Serialize + ?Sized,
    {
        let key = self.key(operation, args)?;
        Ok(self.get_key(&key).await)
    }

    /// Look up an already-encoded key, treating backend failures as a miss
    pub async fn get_key(&self, key: &str) -> Option<Value> {
        match self.backend.get(key).await {
            Ok(value) => {
                crate::debug_log!("Cache get: {} (hit: {})", key, value.is_some());
                value
            }
            Err(source) => {
                let err = CacheError::Read {
                    key: key.to_string(),
                    source,
                };
                tracing::error!(entity = %self.codec.entity(), "{}", err);
                None
            }
        }
    }

    pub async fn set<A>(
        &self,
        operation: &str,
        args: &A,
        value: Value,
        ttl: Option<u64>,
    ) -> Result<(), CacheError>
    where
        A: Serialize + ?Sized,
    {
        let key = self.key(operation, args)?;
        self.set_key(&key, value, ttl).await
    }

    pub async fn set_key(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<(), CacheError> {
        self.backend
            .set(key, value, ttl)
            .await
            .map_err(|source| CacheError::Write {
                key: key.to_string(),
                source,
            })?;
        crate::debug_log!("Cache set: {} (ttl: {:?})", key, ttl);
        Ok(())
    }

    /// Delete one exact key
    pub async fn delete_key(&self, key: &str) -> Result<(), CacheError> {
        self.backend
            .delete(key)
            .await
            .map_err(|source| CacheError::Invalidation {
                target: key.to_string(),
                source,
            })?;
        crate::debug_log!("Cache delete: {}", key);
        Ok(())
    }

    /// Delete every key for `operation` on this entity, or every key for the
    /// entity when `operation` is `None`. Returns how many keys were deleted.
    pub async fn invalidate(&self, operation: Option<&str>) -> Result<usize, CacheError> {
        let target = match operation {
            Some(op) => format!("{}:{}:*", self.codec.entity(), op.to_lowercase()),
            None => format!("{}:*", self.codec.entity()),
        };

        let keys = self
            .backend
            .keys()
            .await
            .map_err(|source| CacheError::Invalidation {
                target: target.clone(),
                source,
            })?;

        let doomed: Vec<String> = keys
            .into_iter()
            .filter(|key| match operation {
                Some(op) => self.codec.matches_operation(key, op),
                None => self.codec.belongs_to_entity(key),
            })
            .collect();

        try_join_all(doomed.iter().map(|key| self.backend.delete(key)))
            .await
            .map_err(|source| CacheError::Invalidation {
                target: target.clone(),
                source,
            })?;

        crate::debug_log!("Cache invalidate: {} ({} keys deleted)", target, doomed.len());
        Ok(doomed.len())
    }

    /// Clear the whole backend
    pub async fn invalidate_all(&self) -> Result<(), CacheError> {
        self.backend
            .clear()
            .await
            .map_err(|source| CacheError::Invalidation {
                target: "*".to_string(),
                source,
            })?;
        crate::debug_log!("Cache cleared");
        Ok(())
    }

    /// Remove entries according to `pattern`; failures come back as [`CacheError::Flush`]
    pub async fn flush(&self, pattern: &FlushPattern) -> Result<(), CacheError> {
        let result = match pattern {
            FlushPattern::All => self.invalidate_all().await,
            FlushPattern::Selective {
                operation: Some(operation),
                args: Some(args),
            } => match self.key(operation, args) {
                Ok(key) => self.delete_key(&key).await,
                Err(err) => Err(err),
            },
            FlushPattern::Selective {
                operation: Some(operation),
                args: None,
            } => self.invalidate(Some(operation)).await.map(|_| ()),
            FlushPattern::Selective { operation: None, .. } => {
                self.invalidate(None).await.map(|_| ())
            }
        };

        result.map_err(|err| {
            tracing::error!(entity = %self.codec.entity(), pattern = %pattern, "Cache flush failed: {}", err);
            CacheError::flush(pattern.to_string(), err)
        })
    }

    /// Whether a live entry exists for the invocation
    pub async fn exists<A>(&self, operation: &str, args: &A) -> Result<bool, CacheError>
    where
        A: Serialize + ?Sized,
    {
        Ok(self.get(operation, args).await?.is_some())
    }

    /// All backend keys, or only those for `operation` on this entity
    pub async fn keys(&self, operation: Option<&str>) -> Result<Vec<String>, CacheError> {
        let keys = self
            .backend
            .keys()
            .await
            .map_err(|source| CacheError::Read {
                key: "*".to_string(),
                source,
            })?;

        Ok(match operation {
            Some(op) => keys
                .into_iter()
                .filter(|key| self.codec.matches_operation(key, op))
                .collect(),
            None => keys,
        })
    }

    /// Cache-key arguments for a raw query: normalized text plus parameters
    pub fn raw_args(query: &str, params: &[Value]) -> Value {
        json!({
            "query": normalize_query(query),
            "params": params,
        })
    }

    pub async fn get_raw(&self, query: &str, params: &[Value]) -> Result<Option<Value>, CacheError> {
        self.get(RAW_QUERY_OPERATION, &Self::raw_args(query, params))
            .await
    }

    pub async fn set_raw(
        &self,
        query: &str,
        params: &[Value],
        value: Value,
        ttl: Option<u64>,
    ) -> Result<(), CacheError> {
        self.set(RAW_QUERY_OPERATION, &Self::raw_args(query, params), value, ttl)
            .await
    }
}
