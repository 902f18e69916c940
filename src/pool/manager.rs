//! Fixed-size PostgreSQL connection pool.
//!
//! `DbPoolManager` opens `max_connections` clients up front and parks them in a bounded
//! channel. `acquire()` waits up to `pool_timeout_seconds` for an idle client, checks it
//! with `SELECT 1` and reconnects if the check fails. The returned `PooledConnection`
//! puts its client back on drop, so a connection is never shared between two requests
//! and `BEGIN`/`COMMIT` pairs can't interleave.

use crate::connection::{check_connection_health, connect, ConnectionError};
use crate::executor::{instrumented, DbError, SqlExecutor};
use crate::pool::config::DatabaseConfig;
use crate::transaction::{IsolationLevel, Transaction, TransactionError};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use may_postgres::types::ToSql;
use may_postgres::{Client, Row};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// Pool error type
#[derive(Debug)]
pub enum PoolError {
    /// `max_connections` was zero or negative
    InvalidSize(i32),
    /// Opening or re-opening a connection failed
    Connection(ConnectionError),
    /// No connection became idle within the configured timeout
    Timeout(Duration),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::InvalidSize(n) => write!(f, "Invalid pool size: {n}"),
            PoolError::Connection(e) => write!(f, "Pool connection error: {e}"),
            PoolError::Timeout(d) => {
                write!(f, "Timed out after {}s waiting for a database connection", d.as_secs())
            }
        }
    }
}

impl std::error::Error for PoolError {}

impl From<ConnectionError> for PoolError {
    fn from(err: ConnectionError) -> Self {
        PoolError::Connection(err)
    }
}

impl From<PoolError> for DbError {
    fn from(err: PoolError) -> Self {
        DbError::Pool(err.to_string())
    }
}

struct PoolInner {
    url: String,
    size: usize,
    timeout: Duration,
    idle_tx: Sender<Client>,
    idle_rx: Receiver<Client>,
}

impl PoolInner {
    fn release(&self, client: Client) {
        // capacity equals the number of clients in circulation, so this never blocks
        if self.idle_tx.send(client).is_err() {
            log::warn!("Connection pool closed; dropping returned connection");
        }
    }
}

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Wait up to `timeout` for a value on `rx`.
///
/// Polls with `may::coroutine::sleep` instead of `recv_timeout`, which would park the
/// `may` worker thread along with the coroutine about to release a connection. Outside
/// a coroutine the sleep is a plain thread sleep.
fn recv_idle<T>(rx: &Receiver<T>, timeout: Duration) -> Option<T> {
    let deadline = Instant::now() + timeout;
    loop {
        match rx.try_recv() {
            Ok(value) => return Some(value),
            Err(TryRecvError::Disconnected) => return None,
            Err(TryRecvError::Empty) => {}
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        may::coroutine::sleep(IDLE_POLL_INTERVAL.min(deadline - now));
    }
}

/// Handle to the shared pool. Cloning is cheap.
#[derive(Clone)]
pub struct DbPoolManager {
    inner: Arc<PoolInner>,
}

impl DbPoolManager {
    /// Open `config.max_connections` connections and build the pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidSize` for a non-positive size, or
    /// `PoolError::Connection` if any connection cannot be opened.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, PoolError> {
        let size = usize::try_from(config.max_connections)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(PoolError::InvalidSize(config.max_connections))?;

        let (idle_tx, idle_rx) = bounded(size);
        for _ in 0..size {
            let client = connect(&config.url)?;
            if idle_tx.send(client).is_err() {
                return Err(PoolError::Connection(ConnectionError::Other(
                    "pool channel closed during start-up".to_string(),
                )));
            }
        }

        log::info!("Database pool ready with {} connection(s)", size);

        Ok(Self {
            inner: Arc::new(PoolInner {
                url: config.url.clone(),
                size,
                timeout: Duration::from_secs(config.pool_timeout_seconds),
                idle_tx,
                idle_rx,
            }),
        })
    }

    /// Take an idle connection out of the pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Timeout` when every connection stays busy for longer than the
    /// configured timeout, or `PoolError::Connection` when a dead connection cannot be
    /// replaced.
    pub fn acquire(&self) -> Result<PooledConnection, PoolError> {
        #[cfg(feature = "tracing")]
        let _span = crate::metrics::tracing_helpers::acquire_connection_span().entered();

        let start = Instant::now();
        let client = recv_idle(&self.inner.idle_rx, self.inner.timeout)
            .ok_or(PoolError::Timeout(self.inner.timeout))?;

        #[cfg(feature = "metrics")]
        METRICS.observe_pool_wait(start.elapsed());
        #[cfg(not(feature = "metrics"))]
        let _ = start;

        let client = match check_connection_health(&client) {
            Ok(true) => client,
            Ok(false) | Err(_) => {
                log::warn!("Pooled connection failed health check; reconnecting");
                match connect(&self.inner.url) {
                    Ok(fresh) => fresh,
                    Err(e) => {
                        // keep the slot in circulation so the pool doesn't shrink
                        self.inner.release(client);
                        return Err(PoolError::Connection(e));
                    }
                }
            }
        };

        Ok(PooledConnection {
            client: Some(client),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Total number of connections managed by the pool.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Connections currently sitting idle.
    pub fn idle(&self) -> usize {
        self.inner.idle_rx.len()
    }
}

/// A connection checked out of the pool; returned on drop.
pub struct PooledConnection {
    client: Option<Client>,
    pool: Arc<PoolInner>,
}

impl PooledConnection {
    /// Start a transaction at `READ COMMITTED`.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError` if `BEGIN` fails.
    pub fn begin(self) -> Result<Transaction, TransactionError> {
        Transaction::begin(self, IsolationLevel::default())
    }

    /// Start a transaction at the given isolation level.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError` if `BEGIN` fails.
    pub fn begin_with_isolation(
        self,
        isolation_level: IsolationLevel,
    ) -> Result<Transaction, TransactionError> {
        Transaction::begin(self, isolation_level)
    }
}

impl Deref for PooledConnection {
    type Target = Client;

    fn deref(&self) -> &Client {
        // only `None` after drop has started
        self.client.as_ref().expect("pooled connection used after release")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.release(client);
        }
    }
}

impl SqlExecutor for PooledConnection {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, DbError> {
        let client: &Client = self;
        instrumented(query, || client.execute(query, params))
    }

    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, DbError> {
        let client: &Client = self;
        instrumented(query, || client.query_one(query, params))
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, DbError> {
        let client: &Client = self;
        instrumented(query, || client.query(query, params))
    }
}
