//! Backend Connection
//!
//! This module implements the transport session to the remote data store.
//! A `Connection` wraps a `TcpStream` with framed statement execution and
//! an idle-time stamp the pool uses for reclamation decisions.
//!
//! The wire format is a minimal length-prefixed frame: a 4-byte big-endian
//! payload length followed by the payload. The pool never interprets
//! response payloads; they are handed back to the caller as opaque bytes.

use bytes::Bytes;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::PoolConfig;
use crate::errors::{PoolError, Result};

/// Upper bound on a single response payload, to catch garbage frames
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// A transport session to the backend data store
///
/// Created by the pool at construction time or by the producer task when
/// the pool grows. Each connection tracks the time it was last released
/// back to the pool; the reaper uses that stamp to decide staleness.
pub struct Connection {
    stream: TcpStream,
    addr: String,
    last_released: Instant,
}

impl Connection {
    /// Opens a session to the backend described by the configuration
    ///
    /// Establishes the TCP stream within `connect_timeout`, then sends a
    /// framed hello carrying the credentials and target database. The
    /// hello is fire-and-forget: no reply is awaited, so a backend that
    /// accepts TCP but later rejects the credentials fails on first use,
    /// not here. A failed TCP connect or hello write surfaces as an error
    /// and such a connection is never handed to the pool.
    pub async fn connect(config: &PoolConfig) -> Result<Self> {
        let addr = config.addr();

        let result = timeout(config.connect_timeout, TcpStream::connect(&addr)).await;
        let stream = match result {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                stream
            }
            Ok(Err(e)) => {
                return Err(PoolError::Network {
                    operation: "connect".to_string(),
                    addr,
                    source: e,
                })
            }
            Err(_) => return Err(PoolError::ConnectionTimeout(addr)),
        };

        let mut conn = Self {
            stream,
            addr,
            last_released: Instant::now(),
        };

        let hello = format!(
            "{}\0{}\0{}",
            config.username, config.password, config.database
        );
        conn.send_frame(hello.as_bytes(), config.connect_timeout)
            .await?;

        Ok(conn)
    }

    /// Executes a statement against the backend
    ///
    /// Sends the statement as one frame and reads one framed reply. The
    /// reply payload is opaque to the pool; interpreting it is the
    /// caller's business. The timeout applies separately to the write and
    /// the read.
    pub async fn execute(&mut self, statement: &str, io_timeout: Duration) -> Result<Bytes> {
        self.send_frame(statement.as_bytes(), io_timeout).await?;
        self.read_frame(io_timeout).await
    }

    /// Records "now" as the moment this connection was released
    ///
    /// Called by the pool every time the connection re-enters the idle
    /// queue, and once at creation.
    pub fn refresh_idle_stamp(&mut self) {
        self.last_released = Instant::now();
    }

    /// Returns how long this connection has sat idle since its last release
    pub fn idle_duration(&self) -> Duration {
        self.last_released.elapsed()
    }

    /// Returns the server address this connection is connected to
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Writes one length-prefixed frame to the backend
    async fn send_frame(&mut self, payload: &[u8], io_timeout: Duration) -> Result<()> {
        let mut buf = Vec::with_capacity(4 + payload.len());
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(payload);

        match timeout(io_timeout, self.stream.write_all(&buf)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PoolError::Network {
                operation: "write".to_string(),
                addr: self.addr.clone(),
                source: e,
            }),
            Err(_) => Err(PoolError::NetworkTimeout("write".to_string())),
        }
    }

    /// Reads one length-prefixed frame from the backend
    async fn read_frame(&mut self, io_timeout: Duration) -> Result<Bytes> {
        let mut header = [0u8; 4];
        match timeout(io_timeout, self.stream.read_exact(&mut header)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(PoolError::Network {
                    operation: "read".to_string(),
                    addr: self.addr.clone(),
                    source: e,
                })
            }
            Err(_) => return Err(PoolError::NetworkTimeout("read".to_string())),
        }

        let len = u32::from_be_bytes(header) as usize;
        if len > MAX_FRAME_LEN {
            return Err(PoolError::InvalidResponse(format!(
                "frame length {} exceeds limit",
                len
            )));
        }

        let mut payload = vec![0u8; len];
        match timeout(io_timeout, self.stream.read_exact(&mut payload)).await {
            Ok(Ok(_)) => Ok(Bytes::from(payload)),
            Ok(Err(e)) => Err(PoolError::Network {
                operation: "read".to_string(),
                addr: self.addr.clone(),
                source: e,
            }),
            Err(_) => Err(PoolError::NetworkTimeout("read".to_string())),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.addr)
            .field("idle_for", &self.idle_duration())
            .finish()
    }
}
