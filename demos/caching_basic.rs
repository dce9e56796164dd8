//! # Basic Caching Example
//!
//! This example demonstrates basic caching functionality:
//! - Choosing a cache backend (Redis when configured, in-memory otherwise)
//! - Cache hits vs misses
//! - Per-call cache overrides
//! - Cache invalidation on writes
//!
//! Run with `RUST_LOG=debug cargo run --example caching_basic --features debug-logging`
//! to see every cache decision.

use repohaus::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🚀 RepoHaus Basic Caching Example");
    println!("=================================");

    // 1. Client and cache setup
    let config = AppConfig::load()?;
    let client = Arc::new(MemoryDataClient::new());
    let mut haus = RepoHaus::new(client, config);

    if haus.config().redis.is_some() {
        match haus.connect_redis().await {
            Ok(()) => println!("✅ Using Redis cache"),
            Err(e) => {
                println!("❌ Redis connection failed: {}", e);
                println!("💡 Please start Redis: docker run -d --name redis -p 6379:6379 redis:7-alpine");
                return Ok(());
            }
        }
    } else {
        haus = haus.with_cache_backend(Arc::new(MemoryBackend::new()));
        println!("✅ Using in-memory cache (add a [redis] section to repohaus.toml for Redis)");
    }
    haus.cache_health_check().await?;

    // 2. Seed some products
    let products = haus.repository("product").build()?;
    products
        .create_many(json!({"data": [
            {"name": "Laptop", "category": "electronics", "price": 1299},
            {"name": "Headphones", "category": "electronics", "price": 199},
            {"name": "Desk", "category": "furniture", "price": 450},
        ]}))
        .await?;
    haus.register_repository(products)?;
    let products = haus.get_repository("product")?;

    // 3. Miss, then hit
    println!("\n🔍 Cache Misses and Hits");
    println!("------------------------");
    let query = json!({"where": {"category": "electronics"}, "orderBy": {"price": "desc"}});

    let start = Instant::now();
    let first = products.find_many(query.clone()).await?;
    println!("First read (miss): {} products in {:?}", first.len(), start.elapsed());

    let start = Instant::now();
    let second = products.find_many(query.clone()).await?;
    println!("Second read (hit): {} products in {:?}", second.len(), start.elapsed());

    // 4. Per-call overrides
    println!("\n⚙️  Per-call Overrides");
    println!("---------------------");
    let total = products
        .cache(CacheOptions::disabled())
        .count(json!({}))
        .await?;
    println!("Uncached count: {}", total);

    products
        .cache(CacheOptions::new().with_ttl(30))
        .find_first(json!({"where": {"name": "Desk"}}))
        .await?;
    println!("Cached the desk lookup for 30 seconds");

    // 5. Writes invalidate
    println!("\n♻️  Invalidation on Writes");
    println!("-------------------------");
    products
        .update(json!({"where": {"name": "Headphones"}, "data": {"price": 149}}))
        .await?;
    let refreshed = products.find_many(query).await?;
    for product in &refreshed {
        println!("  {} - ${}", product["name"], product["price"]);
    }

    // 6. Explicit flushes
    products.flush_operation(ModelOperation::FindFirst).await?;
    products.flush_all().await?;
    println!("\n✅ Cache flushed");

    Ok(())
}
