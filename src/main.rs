//! Stockguard server
//!
//! Loads configuration, applies pending migrations and serves the REST API.

use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stockguard::config::{AppConfig, DEFAULT_CONFIG_PATH};
use stockguard::http::{serve, InventoryApi};
use stockguard::migration::startup_migrations;
use stockguard::{DbPoolManager, InventoryStore, MemoryStore, PgStore, StorageBackend};

#[derive(Parser)]
#[command(name = "stockguard")]
#[command(about = "Warehouse inventory API: RFID tags and item lifecycle")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); STOCKGUARD__* environment variables override it
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = AppConfig::load_from(&cli.config).context("Failed to load configuration")?;
    if config.server.workers > 0 {
        may::config().set_workers(config.server.workers);
    }

    match config.database.backend {
        StorageBackend::Postgres => {
            let pool = DbPoolManager::from_config(&config.database)
                .context("Failed to create connection pool")?;
            if config.migrations.run_on_startup {
                let conn = pool.acquire().context("Failed to acquire connection")?;
                startup_migrations(&conn, config.migrations.lock_timeout())
                    .context("Startup migrations failed")?;
            }
            run(Arc::new(PgStore::new(pool)), &config)
        }
        StorageBackend::Memory => {
            log::warn!("Using the in-memory store; inventory is lost on restart");
            let store = MemoryStore::with_cameras(config.memory.cameras.iter().copied());
            run(Arc::new(store), &config)
        }
    }
}

fn run<S: InventoryStore>(store: Arc<S>, config: &AppConfig) -> anyhow::Result<()> {
    let api = InventoryApi::new(store, config.server.environment.clone());
    let server = serve(api, &config.server)
        .map_err(|e| anyhow!("Failed to start server on {}: {}", config.server.host_port, e))?;
    server
        .join()
        .map_err(|e| anyhow!("Server encountered an error: {:?}", e))?;
    Ok(())
}
