//! Performance benchmarks for the connection pool
//!
//! This benchmark suite measures acquire/release throughput against a stub
//! backend under different pool sizes and contention levels.
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dbpool::{Pool, PoolConfig};
use std::time::Duration;

/// Starts a stub backend that accepts and parks connections
///
/// Returns the port the stub listens on. Runs inside the given runtime so
/// the listener task outlives the benchmark iterations.
fn spawn_backend(rt: &tokio::runtime::Runtime) -> u16 {
    rt.block_on(async {
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
    })
}

/// Benchmark a single uncontended acquire/release cycle
///
/// This is the hot path a request handler pays per unit of work when the
/// pool has idle supply.
fn bench_acquire_release(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let port = spawn_backend(&rt);

    let config = PoolConfig::new("127.0.0.1", port)
        .with_init_size(4)
        .with_max_size(4)
        .with_acquire_timeout(Duration::from_secs(5));
    let pool = rt.block_on(Pool::connect(config)).unwrap();

    c.bench_function("acquire_release_uncontended", |b| {
        b.to_async(&rt).iter(|| async {
            let conn = pool.acquire().await.unwrap();
            black_box(conn.addr());
            // Dropped here: released back to the pool
        });
    });

    rt.block_on(pool.shutdown());
}

/// Benchmark concurrent borrowers competing for a fixed pool
///
/// Measures how the single-lock design behaves as contention rises.
fn bench_contended_acquire(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let port = spawn_backend(&rt);

    let config = PoolConfig::new("127.0.0.1", port)
        .with_init_size(8)
        .with_max_size(8)
        .with_acquire_timeout(Duration::from_secs(5));
    let pool = rt.block_on(Pool::connect(config)).unwrap();

    for workers in [2usize, 4, 8] {
        c.bench_with_input(
            BenchmarkId::new("contended_acquire", workers),
            &workers,
            |b, &workers| {
                b.to_async(&rt).iter(|| async {
                    let tasks: Vec<_> = (0..workers)
                        .map(|_| {
                            let pool = pool.clone();
                            tokio::spawn(async move {
                                let conn = pool.acquire().await.unwrap();
                                black_box(conn.addr().len())
                            })
                        })
                        .collect();
                    for task in tasks {
                        task.await.unwrap();
                    }
                });
            },
        );
    }

    rt.block_on(pool.shutdown());
}

criterion_group!(benches, bench_acquire_release, bench_contended_acquire);
criterion_main!(benches);
