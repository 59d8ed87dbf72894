//! Pool Configuration
//!
//! This module defines the configuration record consumed at pool
//! construction: backend address and credentials, the pool's floor and
//! ceiling, the idle-reclamation threshold, and the acquire timeout.
//!
//! Configuration can be built programmatically or loaded from a flat
//! `key=value` file (one entry per line, lines without `=` ignored).

use std::path::Path;
use std::time::Duration;

use crate::errors::{PoolError, Result};

/// Pool configuration options
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Backend host name or IP address
    pub host: String,
    /// Backend port number
    pub port: u16,
    /// Username presented to the backend on connect
    pub username: String,
    /// Password presented to the backend on connect
    pub password: String,
    /// Target database name
    pub database: String,
    /// Number of connections created eagerly at construction (the floor)
    pub init_size: usize,
    /// Maximum number of live connections, idle or borrowed (the ceiling)
    pub max_size: usize,
    /// Idle duration after which a connection above the floor is reclaimed
    pub max_idle: Duration,
    /// Maximum time an acquire call blocks waiting for an idle connection
    pub acquire_timeout: Duration,
    /// Timeout for establishing the TCP session to the backend
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            username: "root".to_string(),
            password: String::new(),
            database: String::new(),
            init_size: 4,
            max_size: 16,
            max_idle: Duration::from_secs(60),
            acquire_timeout: Duration::from_millis(1000),
            connect_timeout: Duration::from_millis(5000),
        }
    }
}

impl PoolConfig {
    /// Creates a new configuration for the given backend address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Sets the credentials presented to the backend
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the target database name
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the number of connections created at construction
    pub fn with_init_size(mut self, init_size: usize) -> Self {
        self.init_size = init_size;
        self
    }

    /// Sets the maximum number of live connections
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the idle duration after which surplus connections are reclaimed
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Sets the maximum time an acquire call blocks
    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    /// Sets the TCP connect timeout
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Loads configuration from a flat `key=value` file
    ///
    /// Recognized keys: `ip`, `port`, `username`, `password`, `dbname`,
    /// `initSize`, `maxSize`, `maxIdleTime` (seconds), `connectionTimeOut`
    /// (milliseconds). Lines without `=` and unknown keys are ignored.
    /// A missing file or a non-numeric value for a numeric key is an error;
    /// a pool must never come up with silently zeroed settings.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PoolError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;

        let mut config = Self::default();

        for line in contents.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "ip" => config.host = value.to_string(),
                "port" => config.port = parse_num(key, value)?,
                "username" => config.username = value.to_string(),
                "password" => config.password = value.to_string(),
                "dbname" => config.database = value.to_string(),
                "initSize" => config.init_size = parse_num(key, value)?,
                "maxSize" => config.max_size = parse_num(key, value)?,
                "maxIdleTime" => {
                    config.max_idle = Duration::from_secs(parse_num(key, value)?);
                }
                "connectionTimeOut" => {
                    config.acquire_timeout = Duration::from_millis(parse_num(key, value)?);
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Validates the configuration
    ///
    /// Called by pool construction before any connection is opened.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(PoolError::Configuration("host must not be empty".to_string()));
        }
        if self.max_size == 0 {
            return Err(PoolError::Configuration(
                "maxSize must be greater than 0".to_string(),
            ));
        }
        if self.init_size > self.max_size {
            return Err(PoolError::Configuration(format!(
                "initSize ({}) must not exceed maxSize ({})",
                self.init_size, self.max_size
            )));
        }
        if self.acquire_timeout.is_zero() {
            return Err(PoolError::Configuration(
                "connectionTimeOut must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the backend address in "host:port" form
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        PoolError::Configuration(format!("invalid value for {}: {:?}", key, value))
    })
}
