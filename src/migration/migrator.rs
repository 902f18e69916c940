//! Migrator - Core migration execution engine

use crate::executor::SqlExecutor;
use crate::migration::checksum::calculate_checksum;
use crate::migration::lock::MigrationLockGuard;
use crate::migration::state_table::initialize_state_table;
use crate::migration::{
    Migration, MigrationError, MigrationRecord, MigrationStatus, PendingMigration, SchemaManager,
};
use chrono::Utc;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Applies a fixed, ordered set of migrations and tracks them in the state table.
pub struct Migrator {
    migrations: Vec<Box<dyn Migration>>,
}

impl Migrator {
    /// Migrations are applied in ascending `version` order regardless of input order.
    pub fn new(mut migrations: Vec<Box<dyn Migration>>) -> Self {
        migrations.sort_by_key(|m| m.version());
        Self { migrations }
    }

    /// The schema compiled into this crate.
    pub fn embedded() -> Self {
        Self::new(crate::migrations::all())
    }

    pub fn migrations(&self) -> impl Iterator<Item = &dyn Migration> {
        self.migrations.iter().map(|m| m.as_ref())
    }

    /// Compare the state table against the known migrations.
    ///
    /// # Errors
    ///
    /// `ChecksumMismatch` if an applied migration's source changed, `MissingMigration`
    /// if the table records a version this build does not know.
    pub fn status(&self, executor: &dyn SqlExecutor) -> Result<MigrationStatus, MigrationError> {
        initialize_state_table(executor)?;
        let applied = Self::query_applied_migrations(executor)?;

        let known: HashSet<i64> = self.migrations.iter().map(|m| m.version()).collect();
        if let Some(record) = applied.iter().find(|r| !known.contains(&r.version)) {
            return Err(MigrationError::MissingMigration {
                version: record.version,
                name: record.name.clone(),
            });
        }

        let mut applied_records = Vec::new();
        let mut pending = Vec::new();
        for migration in &self.migrations {
            let checksum = calculate_checksum(migration.source());
            match applied.iter().find(|r| r.version == migration.version()) {
                Some(record) if record.checksum != checksum => {
                    return Err(MigrationError::ChecksumMismatch {
                        version: record.version,
                        name: record.name.clone(),
                        stored: record.checksum.clone(),
                        current: checksum,
                    });
                }
                Some(record) => applied_records.push(record.clone()),
                None => pending.push(PendingMigration {
                    version: migration.version(),
                    name: migration.name().to_string(),
                    checksum,
                }),
            }
        }

        Ok(MigrationStatus::new(applied_records, pending))
    }

    /// Fail unless every applied migration still matches its source.
    pub fn validate_checksums(&self, executor: &dyn SqlExecutor) -> Result<(), MigrationError> {
        self.status(executor).map(|_| ())
    }

    /// Take the migration lock and apply everything pending.
    ///
    /// Returns the number of migrations applied.
    pub fn up(
        &self,
        executor: &dyn SqlExecutor,
        lock_timeout: Duration,
    ) -> Result<usize, MigrationError> {
        initialize_state_table(executor)?;
        let lock = MigrationLockGuard::acquire(executor, lock_timeout)?;
        self.up_with_lock(&lock)
    }

    /// Apply pending migrations while `lock` is held.
    pub fn up_with_lock(&self, lock: &MigrationLockGuard<'_>) -> Result<usize, MigrationError> {
        let executor = lock.executor();
        let status = self.status(executor)?;

        let mut applied = 0;
        for pending in &status.pending {
            let Some(migration) = self
                .migrations
                .iter()
                .find(|m| m.version() == pending.version)
            else {
                continue;
            };
            Self::apply(executor, migration.as_ref(), &pending.checksum)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Run one migration and record it in a single transaction.
    fn apply(
        executor: &dyn SqlExecutor,
        migration: &dyn Migration,
        checksum: &str,
    ) -> Result<(), MigrationError> {
        log::info!(
            "Applying migration {} ({})",
            migration.version(),
            migration.name()
        );
        let start = Instant::now();
        executor.execute("BEGIN", &[])?;

        let manager = SchemaManager::new(executor);
        if let Err(e) = migration.up(&manager) {
            if let Err(rollback) = executor.execute("ROLLBACK", &[]) {
                log::error!("Rollback after failed migration failed: {}", rollback);
            }
            return Err(MigrationError::ExecutionFailed {
                version: migration.version(),
                name: migration.name().to_string(),
                error: e.to_string(),
            });
        }

        let record = MigrationRecord {
            version: migration.version(),
            name: migration.name().to_string(),
            checksum: checksum.to_string(),
            applied_at: Utc::now(),
            execution_time_ms: Some(i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX)),
            success: true,
        };
        let recorded = Self::record_migration(executor, &record)
            .and_then(|()| executor.execute("COMMIT", &[]).map_err(MigrationError::from));
        if let Err(e) = recorded {
            let _ = executor.execute("ROLLBACK", &[]);
            return Err(e);
        }

        log::info!(
            "Applied migration {} in {}ms",
            migration.version(),
            record.execution_time_ms.unwrap_or_default()
        );
        Ok(())
    }

    /// Applied migrations, excluding the lock row.
    fn query_applied_migrations(
        executor: &dyn SqlExecutor,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        let rows = executor.query_all(
            "SELECT version, name, checksum, applied_at, execution_time_ms, success \
             FROM stockguard_migrations WHERE version > 0 ORDER BY version ASC",
            &[],
        )?;
        Ok(rows
            .iter()
            .map(MigrationRecord::from_row)
            .collect::<Result<_, _>>()?)
    }

    fn record_migration(
        executor: &dyn SqlExecutor,
        record: &MigrationRecord,
    ) -> Result<(), MigrationError> {
        executor.execute(
            "INSERT INTO stockguard_migrations \
             (version, name, checksum, applied_at, execution_time_ms, success) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                &record.version,
                &record.name,
                &record.checksum,
                &record.applied_at,
                &record.execution_time_ms,
                &record.success,
            ],
        )?;
        Ok(())
    }
}
