//! dbpool: Bounded Async Connection Pool
//!
//! A bounded pool of reusable connections to a remote data store. The pool
//! amortizes the cost of establishing and tearing down backend sessions:
//! clients borrow a connection for one unit of work and return it, while
//! the pool adapts its size between a configured floor and ceiling and
//! reclaims connections that have been idle too long.
//!
//! # Features
//!
//! - Eager creation of the floor number of connections at construction
//! - FIFO reuse of idle connections
//! - Blocking acquire with an explicit timeout as the backpressure signal
//! - Demand-driven growth: a background producer adds one connection per
//!   wake cycle whenever the pool is fully drained, up to the ceiling
//! - Idle reclamation: a background reaper periodically closes connections
//!   idle past the threshold, never dropping below the floor
//! - Explicit lifecycle: construct, clone, use, `shutdown().await`
//! - RAII borrow guard that returns the connection exactly once
//!
//! # Example
//!
//! ```no_run
//! use dbpool::{Pool, PoolConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PoolConfig::new("127.0.0.1", 3306)
//!         .with_credentials("root", "secret")
//!         .with_database("chat")
//!         .with_init_size(4)
//!         .with_max_size(16);
//!     let pool = Pool::connect(config).await?;
//!
//!     let mut conn = pool.acquire().await?;
//!     let reply = conn
//!         .execute("insert into user(name) values('alice')", Duration::from_secs(5))
//!         .await?;
//!     println!("{} reply bytes", reply.len());
//!     drop(conn);
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod config;
mod connection;
mod errors;
mod pool;

// Re-export public API
pub use config::PoolConfig;
pub use connection::Connection;
pub use errors::{PoolError, Result};
pub use pool::{Pool, PooledConnection};
