//! Migration state table management

use crate::executor::{DbError, SqlExecutor};

pub const STATE_TABLE: &str = "stockguard_migrations";

/// Create the `stockguard_migrations` table and its index if they don't exist.
///
/// Besides applied migrations the table holds the lock row (version -1), so it has to
/// exist before the lock can be taken.
pub fn initialize_state_table(executor: &dyn SqlExecutor) -> Result<(), DbError> {
    let sql = r#"
        CREATE TABLE IF NOT EXISTS stockguard_migrations (
            version BIGINT PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            checksum VARCHAR(64) NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL,
            execution_time_ms BIGINT,
            success BOOLEAN NOT NULL DEFAULT true
        )
    "#;
    executor.execute(sql, &[])?;

    let index_sql = r#"
        CREATE INDEX IF NOT EXISTS idx_stockguard_migrations_applied_at
        ON stockguard_migrations(applied_at)
    "#;
    executor.execute(index_sql, &[])?;

    Ok(())
}
