//! Migration: Create Items
//! Version: 20240301090200
//! Description: Item ledger; one in-stock item per tag enforced by a partial unique index

use crate::executor::DbError;
use crate::migration::{Migration, SchemaManager};
use sea_query::{Expr, Index};

pub struct CreateItems;

impl Migration for CreateItems {
    fn name(&self) -> &str {
        "create_items"
    }

    fn version(&self) -> i64 {
        20240301090200
    }

    fn source(&self) -> &'static str {
        include_str!("m20240301090200_create_items.rs")
    }

    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.execute(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id BIGSERIAL PRIMARY KEY,
                category VARCHAR(255) NOT NULL,
                perishable BOOLEAN NOT NULL DEFAULT false,
                weight DOUBLE PRECISION NOT NULL CHECK (weight > 0),
                dry BOOLEAN NOT NULL DEFAULT false,
                fragile BOOLEAN NOT NULL DEFAULT false,
                threshold DOUBLE PRECISION NOT NULL CHECK (threshold > 0),
                expiry_date DATE,
                timestamp_in TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                timestamp_out TIMESTAMPTZ,
                camera_id BIGINT NOT NULL,
                rfid BIGINT,
                CONSTRAINT items_camera_id_fkey FOREIGN KEY (camera_id)
                    REFERENCES camera(camera_id) ON DELETE RESTRICT,
                CONSTRAINT items_rfid_fkey FOREIGN KEY (rfid)
                    REFERENCES rfid_tags(rfid) ON DELETE SET NULL,
                CONSTRAINT items_perishable_expiry CHECK (NOT perishable OR expiry_date IS NOT NULL)
            )
            "#,
        )?;

        manager.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS items_rfid_in_stock \
             ON items(rfid) WHERE timestamp_out IS NULL",
        )?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_items_category")
                .table("items")
                .col(Expr::col("category"))
                .to_owned(),
        )?;
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_items_expiry_date")
                .table("items")
                .col(Expr::col("expiry_date"))
                .to_owned(),
        )
    }
}
