//! Migration status tracking

use crate::migration::MigrationRecord;

/// Applied records from the state table and embedded migrations not yet run.
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub applied: Vec<MigrationRecord>,
    pub pending: Vec<PendingMigration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    pub version: i64,
    pub name: String,
    pub checksum: String,
}

impl MigrationStatus {
    #[must_use]
    pub fn new(applied: Vec<MigrationRecord>, pending: Vec<PendingMigration>) -> Self {
        Self { applied, pending }
    }

    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn latest_applied_version(&self) -> Option<i64> {
        self.applied.iter().map(|m| m.version).max()
    }

    #[must_use]
    pub fn next_pending_version(&self) -> Option<i64> {
        self.pending.first().map(|m| m.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(version: i64) -> MigrationRecord {
        MigrationRecord {
            version,
            name: format!("m{version}"),
            checksum: "x".to_string(),
            applied_at: Utc::now(),
            execution_time_ms: Some(3),
            success: true,
        }
    }

    #[test]
    fn test_status_summary() {
        let status = MigrationStatus::new(
            vec![record(1), record(2)],
            vec![PendingMigration {
                version: 3,
                name: "m3".to_string(),
                checksum: "y".to_string(),
            }],
        );
        assert!(!status.is_up_to_date());
        assert_eq!(status.latest_applied_version(), Some(2));
        assert_eq!(status.next_pending_version(), Some(3));
    }

    #[test]
    fn test_empty_status_is_up_to_date() {
        let status = MigrationStatus::new(vec![], vec![]);
        assert!(status.is_up_to_date());
        assert_eq!(status.latest_applied_version(), None);
    }
}
