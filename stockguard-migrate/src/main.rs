//! Stockguard Migration CLI Tool
//!
//! Applies and inspects the inventory schema compiled into the `stockguard` crate.
//! Suitable for running as a CI/CD or init-container step ahead of the server.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use std::time::Duration;
use stockguard::migration::{MigrationStatus, Migrator};
use stockguard::{connect, SqlExecutor};

#[derive(Parser)]
#[command(name = "stockguard-migrate")]
#[command(about = "Migration management tool for the Stockguard schema")]
#[command(version)]
struct Cli {
    /// Database connection URL
    #[arg(long)]
    database_url: Option<String>,

    /// Seconds to wait for another process holding the migration lock
    #[arg(long, default_value = "60")]
    lock_timeout: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show migration status (applied vs pending)
    Status,

    /// Apply pending migrations
    Up {
        /// Show what would be applied without running anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate checksums of applied migrations
    Validate,
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => {
            if !cli.quiet {
                println!("{}", "Success".green());
            }
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

fn database_url(cli: &Cli) -> anyhow::Result<String> {
    cli.database_url
        .clone()
        .or_else(|| std::env::var("STOCKGUARD_DATABASE_URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| {
            anyhow!(
                "Database URL not provided. Use --database-url or set \
                 STOCKGUARD_DATABASE_URL or DATABASE_URL"
            )
        })
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let url = database_url(cli)?;
    let client = connect(&url).context("Error connecting to database")?;
    let migrator = Migrator::embedded();
    log::debug!("{} embedded migration(s)", migrator.migrations().count());

    match cli.command {
        Commands::Status => handle_status(&migrator, &client),
        Commands::Up { dry_run } => {
            handle_up(&migrator, &client, dry_run, Duration::from_secs(cli.lock_timeout))
        }
        Commands::Validate => handle_validate(&migrator, &client),
    }
}

fn print_status(status: &MigrationStatus) {
    println!("\n{}\n", "Migration Status".bold());

    if status.applied.is_empty() {
        println!("Applied Migrations: None");
    } else {
        println!("Applied Migrations ({}):", status.applied.len());
        for record in &status.applied {
            let time = record
                .execution_time_ms
                .map_or_else(|| "N/A".to_string(), |ms| format!("{ms}ms"));
            println!(
                "  {} m{}_{} ({}, {})",
                "✓".green(),
                record.version,
                record.name,
                record.applied_at.format("%Y-%m-%d %H:%M:%S"),
                time
            );
        }
    }

    println!();
    if status.pending.is_empty() {
        println!("Pending Migrations: None");
    } else {
        println!("Pending Migrations ({}):", status.pending.len());
        for pending in &status.pending {
            println!("  {} m{}_{}", "…".yellow(), pending.version, pending.name);
        }
    }

    println!(
        "\nSummary: {} applied, {} pending",
        status.applied.len(),
        status.pending.len()
    );
}

fn handle_status(migrator: &Migrator, executor: &dyn SqlExecutor) -> anyhow::Result<()> {
    let status = migrator.status(executor)?;
    print_status(&status);
    Ok(())
}

fn handle_up(
    migrator: &Migrator,
    executor: &dyn SqlExecutor,
    dry_run: bool,
    lock_timeout: Duration,
) -> anyhow::Result<()> {
    if dry_run {
        let status = migrator.status(executor)?;
        if status.is_up_to_date() {
            println!("No pending migrations to apply");
        } else {
            println!("Would apply {} migration(s):", status.pending.len());
            for (i, pending) in status.pending.iter().enumerate() {
                println!("  {}. m{}_{}", i + 1, pending.version, pending.name);
            }
        }
        return Ok(());
    }

    println!("Applying migrations...");
    let applied = migrator.up(executor, lock_timeout)?;
    if applied > 0 {
        println!("Successfully applied {} migration(s)", applied);
    } else {
        println!("No migrations to apply");
    }
    Ok(())
}

fn handle_validate(migrator: &Migrator, executor: &dyn SqlExecutor) -> anyhow::Result<()> {
    println!("Validating checksums...");
    migrator.validate_checksums(executor)?;
    println!("All checksums valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_up_dry_run() {
        let cli = Cli::parse_from([
            "stockguard-migrate",
            "--database-url",
            "postgres://localhost/db",
            "up",
            "--dry-run",
        ]);
        assert!(matches!(cli.command, Commands::Up { dry_run: true }));
        assert_eq!(cli.lock_timeout, 60);
    }

    #[test]
    fn test_database_url_prefers_flag() {
        let cli = Cli::parse_from(["stockguard-migrate", "--database-url", "postgres://a/b", "status"]);
        assert_eq!(database_url(&cli).unwrap(), "postgres://a/b");
    }
}
