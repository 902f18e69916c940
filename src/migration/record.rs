//! `MigrationRecord` - rows of the `stockguard_migrations` state table

use crate::executor::DbError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// `SHA-256` of the migration source when it was applied
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
    pub execution_time_ms: Option<i64>,
    pub success: bool,
}

impl MigrationRecord {
    /// Expected columns: `version`, `name`, `checksum`, `applied_at`,
    /// `execution_time_ms`, `success`
    pub fn from_row(row: &may_postgres::Row) -> Result<Self, DbError> {
        Ok(Self {
            version: row.try_get("version")?,
            name: row.try_get("name")?,
            checksum: row.try_get("checksum")?,
            applied_at: row.try_get("applied_at")?,
            execution_time_ms: row.try_get("execution_time_ms")?,
            success: row.try_get("success")?,
        })
    }
}
