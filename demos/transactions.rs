//! # Transactions Example
//!
//! This example demonstrates:
//! - Binding calls to a transaction with `trx`
//! - Cache invalidation deferred until commit
//! - Rollback on error and on timeout
//! - Soft delete and restore

use repohaus::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🚀 RepoHaus Transactions Example");
    println!("================================");

    let mut config = AppConfig::default();
    config.repository.soft_delete = true;

    let client = Arc::new(MemoryDataClient::new());
    let haus = RepoHaus::new(client, config).with_cache_backend(Arc::new(MemoryBackend::new()));

    let accounts = haus.repository("account").build()?;
    let ledger = haus.repository("ledger").build()?;

    accounts
        .create_many(json!({"data": [
            {"id": "alice", "balance": 100},
            {"id": "bob", "balance": 20},
        ]}))
        .await?;
    println!("Accounts: {}", accounts.count(json!({})).await?);

    // 1. A committed transfer
    println!("\n💸 Transfer");
    println!("-----------");
    let (a, l) = (&accounts, &ledger);
    accounts
        .transaction(
            |tx| async move {
                a.trx(&tx)
                    .update(json!({"where": {"id": "alice"}, "data": {"balance": {"decrement": 30}}}))
                    .await?;
                a.trx(&tx)
                    .update(json!({"where": {"id": "bob"}, "data": {"balance": {"increment": 30}}}))
                    .await?;
                l.trx(&tx)
                    .create(json!({"data": {"from": "alice", "to": "bob", "amount": 30}}))
                    .await?;
                println!("Pending invalidations: {:?}", tx.pending_entities());
                Ok::<(), RepositoryError>(())
            },
            None,
        )
        .await?;

    let bob = accounts.find_unique(json!({"where": {"id": "bob"}})).await?;
    println!("✅ Committed, bob now has {}", bob.map(|b| b["balance"].clone()).unwrap_or_default());

    // 2. A transfer that runs out of time
    println!("\n⏱️  Timeout");
    println!("-----------");
    let result = accounts
        .transaction(
            |tx| async move {
                a.trx(&tx)
                    .update(json!({"where": {"id": "alice"}, "data": {"balance": 0}}))
                    .await?;
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<(), RepositoryError>(())
            },
            Some(Duration::from_millis(50)),
        )
        .await;
    println!("❌ {}", result.err().map(|e| e.to_string()).unwrap_or_default());

    let alice = accounts.find_unique(json!({"where": {"id": "alice"}})).await?;
    println!("Alice still has {}", alice.map(|a| a["balance"].clone()).unwrap_or_default());

    // 3. Soft delete
    println!("\n🗑️  Soft Delete");
    println!("--------------");
    accounts.delete(json!({"where": {"id": "bob"}})).await?;
    let live = accounts.count(json!({"where": {"deletedAt": null}})).await?;
    println!("Live accounts after delete: {}", live);

    accounts.restore_by_id(json!("bob"), None).await?;
    let live = accounts.count(json!({"where": {"deletedAt": null}})).await?;
    println!("Live accounts after restore: {}", live);

    Ok(())
}
