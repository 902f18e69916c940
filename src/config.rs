//! Application configuration.
//!
//! Settings come from `config/config.toml` (optional) overlaid by environment variables
//! prefixed `STOCKGUARD`, with `__` between path segments, e.g.
//! `STOCKGUARD__DATABASE__URL` or `STOCKGUARD__SERVER__HOST_PORT`.

pub use crate::pool::config::{DatabaseConfig, StorageBackend};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub migrations: MigrationConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Seed data for `database.backend = "memory"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryConfig {
    /// Camera ids the in-process camera registry knows about
    #[serde(default)]
    pub cameras: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host_port")]
    pub host_port: String,
    /// Reported by the health endpoints
    #[serde(default = "default_environment")]
    pub environment: String,
    /// `may` worker threads; 0 keeps the runtime default
    #[serde(default)]
    pub workers: usize,
    /// Larger request bodies are rejected with 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host_port: default_host_port(),
            environment: default_environment(),
            workers: 0,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
    #[serde(default = "default_lock_timeout_seconds")]
    pub lock_timeout_seconds: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            run_on_startup: default_run_on_startup(),
            lock_timeout_seconds: default_lock_timeout_seconds(),
        }
    }
}

impl MigrationConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_seconds)
    }
}

fn default_host_port() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_run_on_startup() -> bool {
    true
}

fn default_lock_timeout_seconds() -> u64 {
    60
}

fn env_source() -> Environment {
    Environment::with_prefix("STOCKGUARD")
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    /// Load from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from the TOML file at `path` overlaid by the environment.
    ///
    /// A missing file is not an error. A file that exists but cannot be read or parsed
    /// is logged and skipped.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env_source());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!(
                    "Failed to load config file {}, falling back to env: {}",
                    path.display(),
                    err
                );
                Config::builder()
                    .add_source(env_source())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        settings.try_deserialize::<AppConfig>().map_err(|e| {
            ConfigError::Message(format!("Configuration is invalid: {}", e))
        })
    }
}
