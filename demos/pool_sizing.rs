//! Pool Sizing Example
//!
//! This example shows the pool's elastic sizing in action: demand-driven
//! growth by the producer task when the pool is fully drained, and idle
//! reclamation by the reaper task back down to the floor.
//!
//! Run this example with:
//! ```bash
//! cargo run --example pool_sizing
//! ```

use dbpool::{Pool, PoolConfig};
use std::time::Duration;

/// Starts a stub backend that accepts connections and holds them open
async fn spawn_stub_backend() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub listener should bind");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });
    port
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dbpool=debug".into()),
        )
        .init();

    println!("dbpool - Pool Sizing Example");
    println!("{}", "=".repeat(50));

    let port = spawn_stub_backend().await;

    // Floor of 2, ceiling of 4, one-second idle threshold
    let config = PoolConfig::new("127.0.0.1", port)
        .with_init_size(2)
        .with_max_size(4)
        .with_max_idle(Duration::from_secs(1))
        .with_acquire_timeout(Duration::from_millis(500));

    let pool = Pool::connect(config).await?;
    println!(
        "\nConstructed: idle = {}, live = {}",
        pool.idle_count(),
        pool.live_count()
    );

    println!("\nDraining the floor with two borrows...");
    let a = pool.acquire().await?;
    let b = pool.acquire().await?;
    println!(
        "   idle = {}, live = {}",
        pool.idle_count(),
        pool.live_count()
    );

    println!("\nA third borrow wakes the producer, which grows the pool by one...");
    let c = pool.acquire().await?;
    println!(
        "   idle = {}, live = {}",
        pool.idle_count(),
        pool.live_count()
    );

    println!("\nReleasing all three...");
    drop(a);
    drop(b);
    drop(c);
    println!(
        "   idle = {}, live = {}",
        pool.idle_count(),
        pool.live_count()
    );

    println!("\nWaiting out two idle periods for the reaper...");
    tokio::time::sleep(Duration::from_millis(2500)).await;
    println!(
        "   idle = {}, live = {}  (back at the floor)",
        pool.idle_count(),
        pool.live_count()
    );

    pool.shutdown().await;
    Ok(())
}
