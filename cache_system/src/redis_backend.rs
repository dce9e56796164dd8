//! Redis cache backend
//!
//! Values are stored as JSON strings. Every physical key lives under
//! `<key_prefix>:` so `clear` and `keys` only ever touch this namespace.

use crate::backend::{CacheBackend, wildcard_prefix};
use crate::errors::BackendError;
use async_trait::async_trait;
use config::RedisConfig;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;

/// How a `set` with a given ttl is written to Redis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    Never,
    After(u64),
    Immediate,
}

impl Expiry {
    fn from_ttl(ttl: Option<u64>) -> Self {
        match ttl {
            None => Expiry::Never,
            Some(0) => Expiry::Immediate,
            Some(secs) => Expiry::After(secs),
        }
    }
}

/// Redis-based cache backend
#[derive(Clone)]
pub struct RedisBackend {
    client: Arc<Client>,
    config: Arc<RedisConfig>,
    connection_pool: Arc<RwLock<Option<redis::aio::MultiplexedConnection>>>,
}

impl Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connection_status = {
            match self.connection_pool.try_read() {
                Ok(pool) => {
                    if pool.is_some() {
                        "connected"
                    } else {
                        "no_connection"
                    }
                }
                Err(_) => "lock_error",
            }
        };

        f.debug_struct("RedisBackend")
            .field("config", &self.config)
            .field("connected", &connection_status)
            .finish()
    }
}

impl RedisBackend {
    /// Create a new Redis backend. No connection is made until first use.
    pub fn new(config: RedisConfig) -> Result<Self, BackendError> {
        let client = Client::open(config.redis_url.as_str())?;

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
            connection_pool: Arc::new(RwLock::new(None)),
        })
    }

    /// Get or create Redis connection
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, BackendError> {
        let mut pool = self.connection_pool.write().await;

        if pool.is_none() {
            let connection = tokio::time::timeout(
                self.config.connection_timeout(),
                self.client.get_multiplexed_async_connection(),
            )
            .await
            .map_err(|_| BackendError::Timeout(self.config.connection_timeout_ms))??;
            *pool = Some(connection);
        }

        pool.as_ref()
            .cloned()
            .ok_or_else(|| BackendError::Unavailable("Failed to get connection from pool".into()))
    }

    fn physical_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    fn logical_key<'a>(&self, physical: &'a str) -> &'a str {
        physical
            .strip_prefix(self.config.key_prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(physical)
    }

    async fn delete_matching(&self, pattern: &str) -> Result<usize, BackendError> {
        let mut conn = self.get_connection().await?;
        let keys: Vec<String> = conn.keys(pattern).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: usize = conn.del(keys).await?;
        Ok(deleted)
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<String, BackendError> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }

    /// Get current configuration
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, BackendError> {
        let mut conn = self.get_connection().await?;
        let cached: Option<String> = conn.get(self.physical_key(key)).await?;

        match cached {
            Some(json_str) => Ok(Some(serde_json::from_str(&json_str)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<(), BackendError> {
        let json_str = serde_json::to_string(&value)?;
        let physical = self.physical_key(key);
        let mut conn = self.get_connection().await?;

        match Expiry::from_ttl(ttl) {
            Expiry::Never => {
                let _: () = conn.set(&physical, &json_str).await?;
            }
            Expiry::After(secs) => {
                let _: () = conn.set_ex(&physical, &json_str, secs).await?;
            }
            // SETEX rejects 0; the entry is already expired, so drop any stale copy.
            Expiry::Immediate => {
                let _: usize = conn.del(&physical).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        match wildcard_prefix(key) {
            Some(prefix) => {
                let pattern = format!("{}*", self.physical_key(prefix));
                self.delete_matching(&pattern).await?;
            }
            None => {
                let mut conn = self.get_connection().await?;
                let _: usize = conn.del(self.physical_key(key)).await?;
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), BackendError> {
        let pattern = format!("{}:*", self.config.key_prefix);
        self.delete_matching(&pattern).await?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, BackendError> {
        let pattern = format!("{}:*", self.config.key_prefix);
        let mut conn = self.get_connection().await?;
        let keys: Vec<String> = conn.keys(&pattern).await?;

        Ok(keys
            .iter()
            .map(|physical| self.logical_key(physical).to_string())
            .collect())
    }
}
