//! Pool Error Definitions
//!
//! This module defines all error types for the connection pool. Errors are
//! categorized into configuration errors, network errors, and pool-lifecycle
//! errors. Only `AcquireTimeout` is an expected steady-state condition; it is
//! the pool's backpressure signal when demand outruns supply.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Base error type for all pool errors
#[derive(Error, Debug)]
pub enum PoolError {
    /// Configuration file is missing, unreadable, or contains a bad value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Pool has been shut down
    #[error("Pool is closed")]
    PoolClosed,

    /// No idle connection became available within the acquire timeout
    #[error("Timed out acquiring a connection after {waited:?}")]
    AcquireTimeout {
        /// How long the caller waited before giving up
        waited: Duration,
    },

    /// TCP connection establishment timed out
    #[error("Connection timeout to {0}")]
    ConnectionTimeout(String),

    /// Network I/O timeout
    #[error("Network timeout during {0}")]
    NetworkTimeout(String),

    /// Server response is invalid
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Network-related error
    #[error("Network error during {operation} to {addr}: {source}")]
    Network {
        /// The operation that failed (connect, read, write)
        operation: String,
        /// The server address involved
        addr: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PoolError {
    /// Returns true if the error is the pool's expected backpressure signal
    ///
    /// Callers may retry after a timeout; other errors indicate
    /// configuration or backend problems that retrying will not fix.
    pub fn is_acquire_timeout(&self) -> bool {
        matches!(self, PoolError::AcquireTimeout { .. })
    }
}
