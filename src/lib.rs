//! # Stockguard
//!
//! Warehouse inventory service: RFID tag registry and item ledger over PostgreSQL,
//! served by `may_minihttp` on the `may` coroutine runtime.
//!
//! The lifecycle core is [`TagRegistry`] and [`ItemLedger`]. Both run every mutation
//! through one [`store::InventoryTx`], so an item and its tag never disagree about
//! whether the tag is in use.

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod http;
pub mod ledger;
pub mod metrics;
pub mod migration;
pub mod migrations;
pub mod model;
pub mod pool;
pub mod query;
pub mod raw_sql;
pub mod registry;
pub mod store;
pub mod transaction;
pub mod validation;

pub use config::AppConfig;
pub use connection::{connect, ConnectionError};
pub use error::{ErrorKind, InventoryError};
pub use executor::{DbError, SqlExecutor};
pub use ledger::ItemLedger;
pub use pool::{DatabaseConfig, DbPoolManager, PooledConnection, StorageBackend};
pub use raw_sql::{execute_unprepared, query_value};
pub use registry::TagRegistry;
pub use store::{InventoryStore, MemoryStore, PgStore};
pub use transaction::{IsolationLevel, Transaction};
