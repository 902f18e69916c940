//! Flyway-style migration lock on the state table
//!
//! The process that manages to insert the reserved row (version -1) holds the lock.
//! The primary key makes the insert atomic across processes.

use crate::executor::SqlExecutor;
use crate::migration::MigrationError;
use std::time::{Duration, Instant};

/// Reserved version of the lock row. Real migrations use positive versions.
pub const LOCK_VERSION: i64 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STATEMENT_TIMEOUT_SECONDS: u64 = 5;

/// Holds the migration lock; dropping the guard releases it.
pub struct MigrationLockGuard<'a> {
    executor: &'a dyn SqlExecutor,
}

impl<'a> MigrationLockGuard<'a> {
    /// Acquire the lock, waiting up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::LockTimeout` if another process keeps the lock past
    /// `timeout`, or `MigrationError::Database` on any other failure.
    pub fn acquire(
        executor: &'a dyn SqlExecutor,
        timeout: Duration,
    ) -> Result<Self, MigrationError> {
        acquire_migration_lock(executor, timeout)?;
        Ok(Self { executor })
    }

    pub fn executor(&self) -> &'a dyn SqlExecutor {
        self.executor
    }
}

impl Drop for MigrationLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = release_migration_lock(self.executor) {
            log::error!("Failed to release migration lock: {}", e);
        }
    }
}

fn is_statement_timeout(err: &crate::executor::DbError) -> bool {
    let message = err.to_string();
    message.contains("timeout") || message.contains("canceling statement")
}

fn lock_timeout_error(timeout: Duration) -> MigrationError {
    MigrationError::LockTimeout(format!(
        "could not acquire the lock within {} seconds. Another process may be running \
         migrations; a stale lock can be removed with: \
         DELETE FROM stockguard_migrations WHERE version = {}",
        timeout.as_secs(),
        LOCK_VERSION
    ))
}

/// Insert the lock row, polling every 100ms until it succeeds or `timeout` passes.
///
/// A session `statement_timeout` bounds each attempt so a hung insert cannot outlive
/// the overall timeout; it is reset before returning.
pub fn acquire_migration_lock(
    executor: &dyn SqlExecutor,
    timeout: Duration,
) -> Result<(), MigrationError> {
    let start = Instant::now();
    let set_timeout_sql = format!("SET statement_timeout = '{}s'", STATEMENT_TIMEOUT_SECONDS);
    if let Err(e) = executor.execute(&set_timeout_sql, &[]) {
        log::warn!("Could not set statement_timeout for lock acquisition: {}", e);
    }

    let insert_sql = format!(
        "INSERT INTO stockguard_migrations (version, name, checksum, applied_at, success) \
         VALUES ({}, 'LOCK', 'lock', NOW(), true) \
         ON CONFLICT (version) DO NOTHING",
        LOCK_VERSION
    );

    let result = loop {
        if start.elapsed() >= timeout {
            break Err(lock_timeout_error(timeout));
        }

        match executor.execute(&insert_sql, &[]) {
            Ok(rows) if rows > 0 => break Ok(()),
            Ok(_) => {
                log::debug!("Migration lock is held by another process, waiting");
            }
            Err(e) if is_statement_timeout(&e) => {
                log::debug!("Lock attempt timed out, retrying");
            }
            Err(e) => break Err(MigrationError::Database(e)),
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let _ = executor.execute("RESET statement_timeout", &[]);
    result
}

pub fn release_migration_lock(executor: &dyn SqlExecutor) -> Result<(), MigrationError> {
    executor.execute(
        "DELETE FROM stockguard_migrations WHERE version = $1",
        &[&LOCK_VERSION],
    )?;
    Ok(())
}

pub fn is_migration_lock_held(executor: &dyn SqlExecutor) -> Result<bool, MigrationError> {
    let held: bool = crate::raw_sql::query_value(
        executor,
        "SELECT EXISTS (SELECT 1 FROM stockguard_migrations WHERE version = $1)",
        &[&LOCK_VERSION],
    )?;
    Ok(held)
}
