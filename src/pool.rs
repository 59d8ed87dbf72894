//! Connection Pool
//!
//! This module implements the bounded pool of reusable backend connections:
//! the FIFO idle queue, the blocking-with-timeout acquire protocol, the
//! background producer task that grows the pool on demand, and the
//! background reaper task that shrinks it on idleness.
//!
//! All shared state lives behind a single mutex. One shared [`Notify`]
//! carries three predicates: "queue non-empty" for acquirers, "queue empty"
//! for the producer, and the general state-change wake fired on release.
//! Notifications are broadcast, so every waiter re-arms the signal and
//! re-checks its own predicate in a loop after each wake.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::connection::Connection;
use crate::errors::{PoolError, Result};

/// How long the producer backs off after a failed growth attempt
const GROW_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Mutable pool state, guarded by a single lock
struct PoolState {
    /// Connections currently not borrowed, in release order (front = oldest
    /// release). Release order only approximates idleness order under
    /// out-of-order release; the reaper accepts that approximation.
    idle: VecDeque<Connection>,
    /// Total connections owned by the pool, idle or borrowed.
    /// Invariants: `idle.len() <= live <= config.max_size`.
    live: usize,
    /// Set by `shutdown()`; acquire fails and guards stop reinserting.
    closed: bool,
}

/// Shared innards behind the cloneable [`Pool`] handle
struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
    /// Single shared wake signal for acquirers, the producer, and release.
    state_changed: Notify,
    /// Cancelled on shutdown to stop the producer and reaper.
    cancel: CancellationToken,
    /// Producer and reaper handles, joined on shutdown.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// A bounded pool of reusable connections to a remote data store
///
/// The pool eagerly opens `init_size` connections at construction, hands
/// them out via [`acquire`](Pool::acquire), grows one connection at a time
/// up to `max_size` when fully drained, and reclaims connections that sit
/// idle longer than `max_idle` while staying at or above the floor.
///
/// `Pool` is a cheap clone over shared state; pass clones to whichever
/// components need one rather than reaching for a global instance.
///
/// # Example
///
/// ```no_run
/// use dbpool::{Pool, PoolConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = PoolConfig::new("127.0.0.1", 3306)
///         .with_credentials("root", "secret")
///         .with_database("chat");
///     let pool = Pool::connect(config).await?;
///
///     let mut conn = pool.acquire().await?;
///     conn.execute("insert into user(name) values('alice')",
///                  std::time::Duration::from_secs(5)).await?;
///     drop(conn); // back to the pool
///
///     pool.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Clone for Pool {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Pool {
    /// Creates a pool and eagerly opens the floor number of connections
    ///
    /// Validates the configuration, connects `init_size` sessions
    /// synchronously (any failure aborts construction with that error and
    /// closes whatever was already opened), then starts the producer and
    /// reaper as background tasks owned by the pool.
    pub async fn connect(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let mut idle = VecDeque::with_capacity(config.max_size);
        for _ in 0..config.init_size {
            let mut conn = Connection::connect(&config).await?;
            conn.refresh_idle_stamp();
            idle.push_back(conn);
        }

        let live = idle.len();
        let pool = Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    idle,
                    live,
                    closed: false,
                }),
                state_changed: Notify::new(),
                cancel: CancellationToken::new(),
                workers: Mutex::new(Vec::new()),
                config,
            }),
        };

        let producer = tokio::spawn(produce_task(Arc::clone(&pool.inner)));
        let reaper = tokio::spawn(reap_task(Arc::clone(&pool.inner)));
        pool.inner.workers.lock().extend([producer, reaper]);

        debug!(
            addr = %pool.inner.config.addr(),
            init_size = pool.inner.config.init_size,
            max_size = pool.inner.config.max_size,
            "connection pool created"
        );

        Ok(pool)
    }

    /// Borrows a connection from the pool
    ///
    /// Returns the front of the idle queue if one is available, otherwise
    /// blocks up to `acquire_timeout` for a release or for the producer to
    /// grow the pool. A timeout is the pool's backpressure signal and comes
    /// back as [`PoolError::AcquireTimeout`]; the caller owns any retry or
    /// backoff policy.
    ///
    /// No liveness check is performed on the connection handed out.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let start = Instant::now();
        let deadline = start + self.inner.config.acquire_timeout;

        loop {
            // Arm the signal before the predicate check so a release that
            // lands between the check and the wait is not lost.
            let notified = self.inner.state_changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(conn) = self.try_take()? {
                return Ok(PooledConnection {
                    conn: Some(conn),
                    pool: Arc::clone(&self.inner),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if tokio::time::timeout(deadline - now, notified).await.is_err() {
                // The wait expired; one final predicate check before failing,
                // in case a release raced the timeout.
                if let Some(conn) = self.try_take()? {
                    return Ok(PooledConnection {
                        conn: Some(conn),
                        pool: Arc::clone(&self.inner),
                    });
                }
                break;
            }
            // Woken; wakes are broadcast and may be for someone else's
            // predicate, so loop and re-check.
        }

        let waited = start.elapsed();
        warn!(waited_ms = waited.as_millis() as u64, "acquire timed out");
        Err(PoolError::AcquireTimeout { waited })
    }

    /// Pops the front idle connection if the pool has one
    ///
    /// Fails if the pool is closed. On success, wakes the shared signal so
    /// the producer can notice a drained queue.
    fn try_take(&self) -> Result<Option<Connection>> {
        let conn = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(PoolError::PoolClosed);
            }
            state.idle.pop_front()
        };
        match conn {
            Some(conn) => {
                self.inner.state_changed.notify_waiters();
                Ok(Some(conn))
            }
            None => Ok(None),
        }
    }

    /// Returns the number of connections currently idle in the pool
    pub fn idle_count(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    /// Returns the total number of connections owned by the pool
    ///
    /// Counts both idle and borrowed connections.
    pub fn live_count(&self) -> usize {
        self.inner.state.lock().live
    }

    /// Returns true once `shutdown()` has run
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Returns the configuration the pool was built with
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Shuts the pool down
    ///
    /// Marks the pool closed, closes every idle connection, cancels and
    /// joins the producer and reaper, and wakes any blocked acquirers so
    /// they fail with [`PoolError::PoolClosed`]. Connections still borrowed
    /// are closed when their guards drop. Safe to call more than once.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let dropped = state.idle.len();
            state.live -= dropped;
            state.idle.clear();
        }

        self.inner.cancel.cancel();
        self.inner.state_changed.notify_waiters();

        let workers: Vec<JoinHandle<()>> = self.inner.workers.lock().drain(..).collect();
        for worker in workers {
            let _ = worker.await;
        }

        debug!(addr = %self.inner.config.addr(), "connection pool shut down");
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Pool")
            .field("addr", &self.inner.config.addr())
            .field("idle", &state.idle.len())
            .field("live", &state.live)
            .field("closed", &state.closed)
            .finish()
    }
}

/// A borrowed connection, returned to the pool on drop
///
/// Dereferences to [`Connection`]. The pool owns the connection's
/// lifetime; the guard only lends it out. Dropping the guard along any
/// exit path stamps the connection's release time, appends it to the back
/// of the idle queue, and wakes waiters, exactly once. If the pool was
/// shut down while the connection was out, the connection is closed
/// instead of reinserted.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        {
            let mut state = self.pool.state.lock();
            if state.closed {
                // Pool is gone; close the session instead of reinserting.
                state.live = state.live.saturating_sub(1);
            } else {
                conn.refresh_idle_stamp();
                state.idle.push_back(conn);
            }
        }
        self.pool.state_changed.notify_waiters();
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .finish()
    }
}

/// Producer task: grows the pool by one connection per wake cycle
///
/// Stays dormant while idle supply exists. Once woken with the queue empty
/// and headroom under the ceiling, opens exactly one new connection and
/// wakes waiters. The producer is the sole creator after construction and
/// the reaper only shrinks, so checking the ceiling under the lock and
/// connecting outside it cannot overshoot `max_size`.
async fn produce_task(inner: Arc<PoolInner>) {
    loop {
        let notified = inner.state_changed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let should_grow = {
            let state = inner.state.lock();
            if state.closed {
                break;
            }
            state.idle.is_empty() && state.live < inner.config.max_size
        };

        if should_grow {
            match Connection::connect(&inner.config).await {
                Ok(mut conn) => {
                    conn.refresh_idle_stamp();
                    let live = {
                        let mut state = inner.state.lock();
                        if state.closed {
                            break;
                        }
                        state.idle.push_back(conn);
                        state.live += 1;
                        state.live
                    };
                    inner.state_changed.notify_waiters();
                    debug!(live, "pool grew by one connection");
                }
                Err(e) => {
                    // Failed growth attempt: nothing is enqueued and the
                    // live count is untouched. Back off before retrying so
                    // a dead backend does not turn this loop into a spin.
                    warn!(error = %e, "failed to grow pool");
                    tokio::select! {
                        _ = tokio::time::sleep(GROW_RETRY_DELAY) => {}
                        _ = inner.cancel.cancelled() => break,
                    }
                }
            }
            continue;
        }

        // Supply exists or the ceiling is reached: wait for the next
        // state change. Wakes are broadcast, so the emptiness check above
        // runs again on every pass.
        tokio::select! {
            _ = &mut notified => {}
            _ = inner.cancel.cancelled() => break,
        }
    }
}

/// Reaper task: periodically reclaims stale idle connections
///
/// Sleeps for `max_idle` each cycle, then pops connections off the front
/// of the idle queue while the front entry has been idle at least
/// `max_idle` and the live count is above the floor. The scan stops at the
/// first fresh entry; under the release-order approximation, later entries
/// are assumed no staler. A connection crossing the threshold is therefore
/// reclaimed within one to two cycles, never below `init_size`.
async fn reap_task(inner: Arc<PoolInner>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(inner.config.max_idle) => {}
            _ = inner.cancel.cancelled() => break,
        }

        let mut reclaimed = 0usize;
        {
            let mut state = inner.state.lock();
            if state.closed {
                break;
            }
            while state.live > inner.config.init_size {
                let stale = state
                    .idle
                    .front()
                    .is_some_and(|conn| conn.idle_duration() >= inner.config.max_idle);
                if !stale {
                    break;
                }
                state.idle.pop_front();
                state.live -= 1;
                reclaimed += 1;
            }
        }

        if reclaimed > 0 {
            debug!(reclaimed, "reaped stale idle connections");
        }
    }
}
