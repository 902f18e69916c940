//! Migration: Create RFID Tags
//! Version: 20240301090100
//! Description: Registered RFID tags and their in-use flag

use crate::executor::DbError;
use crate::migration::{Migration, SchemaManager};

pub struct CreateRfidTags;

impl Migration for CreateRfidTags {
    fn name(&self) -> &str {
        "create_rfid_tags"
    }

    fn version(&self) -> i64 {
        20240301090100
    }

    fn source(&self) -> &'static str {
        include_str!("m20240301090100_create_rfid_tags.rs")
    }

    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.execute(
            r#"
            CREATE TABLE IF NOT EXISTS rfid_tags (
                rfid BIGINT NOT NULL,
                used BOOLEAN NOT NULL DEFAULT false,
                CONSTRAINT rfid_tags_pkey PRIMARY KEY (rfid),
                CONSTRAINT rfid_tags_rfid_positive CHECK (rfid > 0)
            )
            "#,
        )?;

        manager.execute("CREATE INDEX IF NOT EXISTS idx_rfid_tags_used ON rfid_tags(used)")
    }
}
