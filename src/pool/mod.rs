//! Connection pooling.

pub mod config;
mod manager;

pub use config::{DatabaseConfig, StorageBackend};
pub use manager::{DbPoolManager, PoolError, PooledConnection};
