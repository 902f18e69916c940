//! Schema migrations
//!
//! Migrations are compiled into the crate (see `crate::migrations`) and tracked in the
//! `stockguard_migrations` table together with a SHA-256 of their source. Concurrent
//! processes serialise on a lock row in the same table.

pub mod checksum;
pub mod error;
pub mod lock;
pub mod migration;
pub mod migrator;
pub mod record;
pub mod schema_manager;
pub mod startup;
pub mod state_table;
pub mod status;

pub use error::MigrationError;
pub use lock::MigrationLockGuard;
pub use migration::Migration;
pub use migrator::Migrator;
pub use record::MigrationRecord;
pub use schema_manager::SchemaManager;
pub use startup::startup_migrations;
pub use status::{MigrationStatus, PendingMigration};
