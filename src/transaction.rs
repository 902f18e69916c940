//! Database transactions over a pooled connection.
//!
//! A `Transaction` owns the `PooledConnection` it runs on, so no other request can issue
//! statements on that client until the transaction is finished and the connection goes
//! back to the pool. Dropping an open transaction rolls it back.

use crate::executor::{instrumented, DbError, SqlExecutor};
use crate::pool::PooledConnection;
use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError, Row};
use std::fmt;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Transaction isolation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read committed (default)
    #[default]
    ReadCommitted,
    /// Repeatable read
    RepeatableRead,
    /// Serializable
    Serializable,
}

impl IsolationLevel {
    /// Convert to PostgreSQL SQL syntax
    pub(crate) fn to_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Transaction error type
#[derive(Debug)]
pub enum TransactionError {
    /// `BEGIN`, `COMMIT` or `ROLLBACK` failed on the server
    PostgresError(PostgresError),
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::PostgresError(e) => write!(f, "Transaction failed: {}", e),
        }
    }
}

impl std::error::Error for TransactionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransactionError::PostgresError(e) => Some(e),
        }
    }
}

impl From<PostgresError> for TransactionError {
    fn from(err: PostgresError) -> Self {
        TransactionError::PostgresError(err)
    }
}

impl From<TransactionError> for DbError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::PostgresError(e) => DbError::Postgres(e),
        }
    }
}

/// A database transaction
///
/// # Examples
///
/// ```no_run
/// use stockguard::pool::{DatabaseConfig, DbPoolManager};
/// use stockguard::{DbError, SqlExecutor};
///
/// # fn main() -> Result<(), DbError> {
/// let pool = DbPoolManager::from_config(&DatabaseConfig::default())?;
/// let tx = pool.acquire()?.begin()?;
///
/// tx.execute("UPDATE rfid_tags SET used = true WHERE rfid = $1", &[&1001i64])?;
/// tx.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct Transaction {
    conn: PooledConnection,
    /// Set once COMMIT or ROLLBACK has been sent
    finished: bool,
}

impl Transaction {
    pub(crate) fn begin(
        conn: PooledConnection,
        isolation_level: IsolationLevel,
    ) -> Result<Self, TransactionError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::begin_transaction_span().entered();

        let begin_sql = format!("BEGIN ISOLATION LEVEL {}", isolation_level.to_sql());
        let client: &Client = &conn;
        client.execute(begin_sql.as_str(), &[])?;

        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Commit and hand the connection back to the pool.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::PostgresError` if `COMMIT` fails; the server has then
    /// already discarded the transaction.
    pub fn commit(mut self) -> Result<(), TransactionError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::commit_transaction_span().entered();

        self.finished = true;
        self.client().execute("COMMIT", &[])?;
        Ok(())
    }

    /// Roll back explicitly. Dropping the transaction does the same.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::PostgresError` if `ROLLBACK` fails.
    pub fn rollback(mut self) -> Result<(), TransactionError> {
        self.finish_with_rollback()
    }

    fn finish_with_rollback(&mut self) -> Result<(), TransactionError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::rollback_transaction_span().entered();

        self.finished = true;
        self.client().execute("ROLLBACK", &[])?;
        Ok(())
    }

    fn client(&self) -> &Client {
        &self.conn
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("Rolling back transaction dropped without commit");
            if let Err(e) = self.finish_with_rollback() {
                log::error!("Rollback of abandoned transaction failed: {}", e);
            }
        }
    }
}

impl SqlExecutor for Transaction {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, DbError> {
        instrumented(query, || self.client().execute(query, params))
    }

    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, DbError> {
        instrumented(query, || self.client().query_one(query, params))
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, DbError> {
        instrumented(query, || self.client().query(query, params))
    }
}
