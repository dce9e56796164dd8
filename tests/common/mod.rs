//! Shared fixtures for integration tests

#![allow(dead_code)]

use repohaus::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Memory backend that counts calls and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub inner: MemoryBackend,
    pub gets: Arc<AtomicUsize>,
    pub sets: Arc<AtomicUsize>,
    pub deletes: Arc<AtomicUsize>,
    pub fail_get: Arc<AtomicBool>,
    pub fail_set: Arc<AtomicBool>,
    pub fail_delete: Arc<AtomicBool>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub async fn key_set(&self) -> BTreeSet<String> {
        self.inner.keys().await.unwrap().into_iter().collect()
    }

    fn down() -> BackendError {
        BackendError::Unavailable("injected failure".to_string())
    }
}

#[async_trait]
impl CacheBackend for RecordingBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, BackendError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::down());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<(), BackendError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(Self::down());
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::down());
        }
        self.inner.delete(key).await
    }

    async fn clear(&self) -> Result<(), BackendError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::down());
        }
        self.inner.clear().await
    }

    async fn keys(&self) -> Result<Vec<String>, BackendError> {
        self.inner.keys().await
    }
}

/// Memory client that records every operation it runs and can be slowed down
#[derive(Clone, Default)]
pub struct CountingClient {
    pub inner: MemoryDataClient,
    pub calls: Arc<Mutex<Vec<(String, ModelOperation)>>>,
    pub delay: Option<Duration>,
}

impl CountingClient {
    pub fn new(inner: MemoryDataClient) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self, operation: ModelOperation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, op)| *op == operation)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DataClient for CountingClient {
    async fn run(&self, model: &str, operation: ModelOperation, args: Value) -> RepositoryResult<Value> {
        self.calls.lock().unwrap().push((model.to_string(), operation));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.run(model, operation, args).await
    }

    async fn execute_raw(&self, query: &str, params: &[Value]) -> RepositoryResult<u64> {
        self.inner.execute_raw(query, params).await
    }

    async fn query_raw(&self, query: &str, params: &[Value]) -> RepositoryResult<Value> {
        self.inner.query_raw(query, params).await
    }

    async fn begin(&self) -> RepositoryResult<Arc<dyn TransactionClient>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.begin().await
    }
}

pub async fn seeded_client() -> MemoryDataClient {
    let client = MemoryDataClient::new();
    client
        .seed(
            "user",
            vec![
                json!({"id": 1, "email": "a@x.com", "name": "Ann", "role": "admin"}),
                json!({"id": 2, "email": "b@x.com", "name": "Bob", "role": "user"}),
                json!({"id": 3, "email": "c@x.com", "name": "Cid", "role": "user"}),
            ],
        )
        .await;
    client
}

/// Cached `user` repository over a counting client and recording backend
pub async fn cached_users() -> (Repository, CountingClient, RecordingBackend) {
    let client = CountingClient::new(seeded_client().await);
    let backend = RecordingBackend::new();
    let repo = RepositoryBuilder::new(Arc::new(client.clone()), "user")
        .with_cache(Arc::new(backend.clone()), CacheSettings::new())
        .build()
        .unwrap();
    (repo, client, backend)
}
