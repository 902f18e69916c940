//! Migration-specific error types

use crate::executor::DbError;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// Database execution error
    Database(DbError),
    /// An applied migration no longer matches its embedded source
    ChecksumMismatch {
        version: i64,
        name: String,
        stored: String,
        current: String,
    },
    /// Migration lock timeout
    LockTimeout(String),
    /// Migration failed during execution and was rolled back
    ExecutionFailed {
        version: i64,
        name: String,
        error: String,
    },
    /// The state table records a version this binary does not embed
    MissingMigration { version: i64, name: String },
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Database(e) => write!(f, "Database error: {}", e),
            MigrationError::ChecksumMismatch {
                version,
                name,
                stored,
                current,
            } => {
                write!(
                    f,
                    "Migration '{}' (version {}) has been modified after being applied.\n\
                     Stored checksum: {}\n\
                     Current checksum: {}",
                    name, version, stored, current
                )
            }
            MigrationError::LockTimeout(msg) => write!(f, "Migration lock timeout: {}", msg),
            MigrationError::ExecutionFailed {
                version,
                name,
                error,
            } => {
                write!(
                    f,
                    "Migration '{}' (version {}) failed during execution: {}",
                    name, version, error
                )
            }
            MigrationError::MissingMigration { version, name } => {
                write!(
                    f,
                    "Applied migration '{}' (version {}) is not known to this build",
                    name, version
                )
            }
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbError> for MigrationError {
    fn from(error: DbError) -> Self {
        MigrationError::Database(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_mismatch_display() {
        let err = MigrationError::ChecksumMismatch {
            version: 1,
            name: "create_camera".to_string(),
            stored: "aaa".to_string(),
            current: "bbb".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("create_camera"));
        assert!(text.contains("Stored checksum: aaa"));
        assert!(text.contains("Current checksum: bbb"));
    }

    #[test]
    fn test_database_error_has_source() {
        use std::error::Error;
        let err = MigrationError::from(DbError::Other("gone".to_string()));
        assert!(err.source().is_some());
    }
}
