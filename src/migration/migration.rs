//! Migration trait definition

use super::schema_manager::SchemaManager;
use crate::executor::DbError;

/// A forward-only schema change compiled into the binary.
///
/// `source` is hashed into the checksum stored with the applied record, so editing a
/// migration that has already run is detected on the next start.
pub trait Migration: Send + Sync {
    /// Human-readable identifier, e.g. `create_items`
    fn name(&self) -> &str;

    /// Ordering key; must be positive and unique
    fn version(&self) -> i64;

    /// Text the checksum is computed from, normally `include_str!(file!())`
    fn source(&self) -> &'static str;

    /// Apply the migration.
    ///
    /// Runs inside a transaction opened by the `Migrator`; any error rolls it back.
    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError>;
}
