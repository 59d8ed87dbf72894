//! Basic Usage Example
//!
//! This example walks through the pool's lifecycle end to end: build a
//! configuration, construct the pool, borrow a connection, execute a
//! statement, release by drop, and shut the pool down.
//!
//! A stub backend is started on a local port so the example runs without a
//! real data store; point the configuration at your server to run it for
//! real.
//!
//! Run this example with:
//! ```bash
//! cargo run --example basic_usage
//! ```

use dbpool::{Pool, PoolConfig};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Starts a stub backend that speaks the framed wire format
///
/// Reads the hello frame on each new connection, then answers every
/// statement frame with an "ok" reply. Returns the stub's port.
async fn spawn_stub_backend() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub listener should bind");
    let port = listener.local_addr().expect("local addr").port();

    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                loop {
                    let mut header = [0u8; 4];
                    if sock.read_exact(&mut header).await.is_err() {
                        return;
                    }
                    let len = u32::from_be_bytes(header) as usize;
                    let mut payload = vec![0u8; len];
                    if sock.read_exact(&mut payload).await.is_err() {
                        return;
                    }
                    // First frame is the hello; reply to everything after it
                    if payload.contains(&0) {
                        continue;
                    }
                    let reply = b"ok";
                    let mut out = Vec::with_capacity(4 + reply.len());
                    out.extend_from_slice(&(reply.len() as u32).to_be_bytes());
                    out.extend_from_slice(reply);
                    if sock.write_all(&out).await.is_err() {
                        return;
                    }
                }
            });
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

    println!("dbpool - Basic Usage Example");
    println!("{}", "=".repeat(50));

    let port = spawn_stub_backend().await;

    // Configuration can also come from a key=value file:
    //     let config = PoolConfig::from_file("db.ini")?;
    let config = PoolConfig::new("127.0.0.1", port)
        .with_credentials("root", "123456")
        .with_database("chat")
        .with_init_size(2)
        .with_max_size(8)
        .with_max_idle(Duration::from_secs(60))
        .with_acquire_timeout(Duration::from_millis(500));

    println!("\n1. Constructing the pool (eagerly opens the floor)...");
    let pool = Pool::connect(config).await?;
    println!(
        "   idle = {}, live = {}",
        pool.idle_count(),
        pool.live_count()
    );

    println!("\n2. Borrowing a connection and executing a statement...");
    let mut conn = pool.acquire().await?;
    let reply = conn
        .execute(
            "insert into user(name,age,sex) values('zhang san',20,'male')",
            Duration::from_secs(5),
        )
        .await?;
    println!("   backend replied with {} bytes", reply.len());

    println!("\n3. Releasing by drop...");
    drop(conn);
    println!(
        "   idle = {}, live = {}",
        pool.idle_count(),
        pool.live_count()
    );

    println!("\n4. Shutting down...");
    pool.shutdown().await;
    println!("   closed = {}", pool.is_closed());

    Ok(())
}
