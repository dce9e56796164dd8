//! Integration tests for cache-aside reads and write invalidation
//!
//! Runs repositories over the in-memory client with a call-recording cache
//! backend, so every test can assert exactly which layer served a call.

mod common;

use common::{RecordingBackend, cached_users};
use repohaus::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn test_repeated_read_is_served_from_cache() {
    let (users, client, backend) = cached_users().await;
    let args = json!({"where": {"role": "user"}, "orderBy": {"id": "asc"}});

    let first = users.find_many(args.clone()).await.unwrap();
    let second = users.find_many(args).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(client.calls(ModelOperation::FindMany), 1);
    assert_eq!(backend.sets(), 1);
    assert_eq!(backend.gets(), 2);
}

#[tokio::test]
async fn test_argument_key_order_shares_cache_entry() {
    let (users, client, _) = cached_users().await;

    users
        .count(serde_json::from_str(r#"{"where":{"role":"user","name":"Bob"}}"#).unwrap())
        .await
        .unwrap();
    users
        .count(serde_json::from_str(r#"{"where":{"name":"Bob","role":"user"}}"#).unwrap())
        .await
        .unwrap();

    assert_eq!(client.calls(ModelOperation::Count), 1);
}

#[tokio::test]
async fn test_write_invalidates_entity_keys_only() {
    let client = common::seeded_client().await;
    let backend = RecordingBackend::new();
    let build = |model: &str| {
        RepositoryBuilder::new(Arc::new(client.clone()), model)
            .with_cache(Arc::new(backend.clone()), CacheSettings::new())
            .build()
            .unwrap()
    };
    let users = build("user");
    let posts = build("post");

    users.find_many(json!({})).await.unwrap();
    users.count(json!({})).await.unwrap();
    posts.find_many(json!({})).await.unwrap();
    assert_eq!(backend.key_set().await.len(), 3);

    users
        .create(json!({"data": {"email": "d@x.com", "name": "Dee"}}))
        .await
        .unwrap();

    let post_key = posts
        .cache_operations()
        .unwrap()
        .key("findMany", &json!({}))
        .unwrap();
    assert_eq!(backend.key_set().await, BTreeSet::from([post_key]));
    assert_eq!(users.count(json!({})).await.unwrap(), 4);
}

#[tokio::test]
async fn test_failed_write_does_not_invalidate() {
    let (users, _, backend) = cached_users().await;
    users.find_many(json!({})).await.unwrap();

    let err = users
        .update(json!({"where": {"id": 99}, "data": {"name": "nobody"}}))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::NotFound { .. }));
    assert_eq!(backend.key_set().await.len(), 1);
    assert_eq!(backend.deletes(), 0);
}

#[tokio::test]
async fn test_backend_read_failure_falls_back_to_client() {
    let (users, client, backend) = cached_users().await;
    backend.fail_get.store(true, Ordering::SeqCst);

    let first = users.find_unique(json!({"where": {"id": 2}})).await.unwrap();
    let second = users.find_unique(json!({"where": {"id": 2}})).await.unwrap();

    assert_eq!(first.unwrap()["name"], "Bob");
    assert!(second.is_some());
    assert_eq!(client.calls(ModelOperation::FindUnique), 2);
}

#[tokio::test]
async fn test_backend_write_failure_still_returns_result() {
    let (users, client, backend) = cached_users().await;
    backend.fail_set.store(true, Ordering::SeqCst);

    let found = users.find_first(json!({"where": {"role": "admin"}})).await.unwrap();
    assert_eq!(found.unwrap()["email"], "a@x.com");

    users.find_first(json!({"where": {"role": "admin"}})).await.unwrap();
    assert_eq!(client.calls(ModelOperation::FindFirst), 2);
    assert!(backend.key_set().await.is_empty());
}

#[tokio::test]
async fn test_invalidation_failure_does_not_fail_write() {
    let (users, _, backend) = cached_users().await;
    users.find_many(json!({})).await.unwrap();
    backend.fail_delete.store(true, Ordering::SeqCst);

    let created = users
        .create(json!({"data": {"email": "e@x.com"}}))
        .await
        .unwrap();
    assert_eq!(created["email"], "e@x.com");
}

#[tokio::test]
async fn test_cache_override_applies_to_one_call() {
    let (users, client, backend) = cached_users().await;

    users
        .cache(CacheOptions::disabled())
        .find_many(json!({}))
        .await
        .unwrap();
    assert_eq!(backend.gets(), 0);
    assert_eq!(backend.sets(), 0);

    users.find_many(json!({})).await.unwrap();
    users.find_many(json!({})).await.unwrap();
    assert_eq!(backend.sets(), 1);
    assert_eq!(client.calls(ModelOperation::FindMany), 2);
}

#[tokio::test]
async fn test_ttl_override_applies_to_one_call() {
    let (users, _, backend) = cached_users().await;
    let ops = users.cache_operations().unwrap().clone();
    let short = json!({"where": {"id": 1}});
    let default = json!({"where": {"id": 2}});

    users
        .cache(CacheOptions::new().with_ttl(5))
        .find_unique(short.clone())
        .await
        .unwrap();
    users.find_unique(default.clone()).await.unwrap();

    let short_ttl = backend
        .inner
        .ttl(&ops.key("findUnique", &short).unwrap())
        .await
        .unwrap();
    let default_ttl = backend
        .inner
        .ttl(&ops.key("findUnique", &default).unwrap())
        .await
        .unwrap();
    assert!(short_ttl <= Duration::from_secs(5));
    assert!(default_ttl > Duration::from_secs(3500));
}

#[tokio::test]
async fn test_caching_disabled_by_default_can_be_forced_on() {
    let client = common::CountingClient::new(common::seeded_client().await);
    let backend = RecordingBackend::new();
    let users = RepositoryBuilder::new(Arc::new(client.clone()), "user")
        .with_cache(
            Arc::new(backend.clone()),
            CacheSettings::new().with_default_caching(false),
        )
        .build()
        .unwrap();

    users.count(json!({})).await.unwrap();
    assert_eq!(backend.gets(), 0);

    users
        .cache(CacheOptions::new().with_cache(true))
        .count(json!({}))
        .await
        .unwrap();
    assert_eq!(backend.sets(), 1);
}

#[tokio::test]
async fn test_missing_record_is_not_cached() {
    let (users, client, backend) = cached_users().await;
    let args = json!({"where": {"email": "nobody@x.com"}});

    assert!(users.find_unique(args.clone()).await.unwrap().is_none());
    assert!(users.find_unique(args).await.unwrap().is_none());

    assert_eq!(backend.sets(), 0);
    assert_eq!(client.calls(ModelOperation::FindUnique), 2);
}

#[tokio::test]
async fn test_flush_operation_leaves_other_operations() {
    let (users, _, backend) = cached_users().await;
    let ops = users.cache_operations().unwrap().clone();

    users.find_many(json!({})).await.unwrap();
    users.find_many(json!({"take": 1})).await.unwrap();
    users.find_first(json!({})).await.unwrap();
    users.count(json!({})).await.unwrap();

    users.flush_operation(ModelOperation::FindMany).await.unwrap();

    let expected = BTreeSet::from([
        ops.key("findFirst", &json!({})).unwrap(),
        ops.key("count", &json!({})).unwrap(),
    ]);
    assert_eq!(backend.key_set().await, expected);
}

#[tokio::test]
async fn test_flush_exact_and_flush_all() {
    let (users, client, backend) = cached_users().await;

    users.find_many(json!({})).await.unwrap();
    users.find_many(json!({"take": 1})).await.unwrap();
    backend.inner.set("foreign", json!(1), None).await.unwrap();

    users
        .flush_exact(ModelOperation::FindMany, json!({"take": 1}))
        .await
        .unwrap();
    assert_eq!(backend.key_set().await.len(), 2);

    users.find_many(json!({})).await.unwrap();
    assert_eq!(client.calls(ModelOperation::FindMany), 2);

    users.flush_all().await.unwrap();
    assert!(backend.key_set().await.is_empty());
}

#[tokio::test]
async fn test_flush_failure_surfaces() {
    let (users, _, backend) = cached_users().await;
    backend.fail_delete.store(true, Ordering::SeqCst);

    let err = users.flush_all().await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Cache(CacheError::Flush { .. })
    ));
}

#[tokio::test]
async fn test_uncached_repository_never_touches_cache() {
    let client = common::CountingClient::new(common::seeded_client().await);
    let users = RepositoryBuilder::new(Arc::new(client.clone()), "user")
        .build()
        .unwrap();

    users.find_many(json!({})).await.unwrap();
    users.find_many(json!({})).await.unwrap();

    assert!(!users.is_cached());
    assert_eq!(client.calls(ModelOperation::FindMany), 2);
    users.flush_all().await.unwrap();
}

#[tokio::test]
async fn test_custom_sanitizer_keys() {
    let client = common::seeded_client().await;
    let backend = RecordingBackend::new();
    let users = RepositoryBuilder::new(Arc::new(client), "user")
        .with_cache(
            Arc::new(backend.clone()),
            CacheSettings::new().with_key_sanitizer(|key: &str| Some(format!("app:{}", key))),
        )
        .build()
        .unwrap();

    users.count(json!({})).await.unwrap();

    assert_eq!(
        backend.key_set().await,
        BTreeSet::from([r#"app:user:count:{}"#.to_string()])
    );
}

#[tokio::test]
async fn test_raw_queries_cached_and_invalidated_by_raw_writes() {
    let selects = Arc::new(AtomicUsize::new(0));
    let counter = selects.clone();
    let client = MemoryDataClient::new().with_raw_handler(move |query: &str, _params: &[Value]| {
        if query.trim_start().starts_with("SELECT") {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!([{"total": 3}]))
        } else {
            Ok(json!(3))
        }
    });
    let backend = RecordingBackend::new();
    let users = RepositoryBuilder::new(Arc::new(client), "user")
        .with_cache(Arc::new(backend.clone()), CacheSettings::new())
        .build()
        .unwrap();

    let sql = "SELECT count(*) AS total FROM users WHERE role = $1";
    let params = [json!("user")];
    users.query_raw(sql, &params).await.unwrap();
    users
        .query_raw("SELECT count(*) AS total\n  FROM users WHERE role = $1", &params)
        .await
        .unwrap();
    assert_eq!(selects.load(Ordering::SeqCst), 1);

    let affected = users
        .execute_raw("UPDATE users SET role = $1", &params)
        .await
        .unwrap();
    assert_eq!(affected, 3);
    assert!(backend.key_set().await.is_empty());

    users.query_raw(sql, &params).await.unwrap();
    assert_eq!(selects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_lookup_update_lookup_scenario() {
    let (users, client, _) = cached_users().await;
    let by_email = json!({"where": {"email": "a@x.com"}});

    let before = users.find_unique(by_email.clone()).await.unwrap().unwrap();
    let cached = users.find_unique(by_email.clone()).await.unwrap().unwrap();
    assert_eq!(before, cached);
    assert_eq!(client.calls(ModelOperation::FindUnique), 1);

    users
        .update(json!({"where": {"email": "a@x.com"}, "data": {"name": "Anna"}}))
        .await
        .unwrap();

    let after = users.find_unique(by_email).await.unwrap().unwrap();
    assert_eq!(after["name"], "Anna");
    assert_eq!(client.calls(ModelOperation::FindUnique), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_operation_times_out() {
    let client = common::CountingClient::new(common::seeded_client().await)
        .with_delay(Duration::from_millis(500));
    let users = RepositoryBuilder::new(Arc::new(client), "user")
        .with_timeout(100)
        .build()
        .unwrap();

    let err = users.find_many(json!({})).await.unwrap_err();
    match err {
        RepositoryError::Timeout { operation, timeout_ms } => {
            assert_eq!(operation, "user.findMany");
            assert_eq!(timeout_ms, 100);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}
