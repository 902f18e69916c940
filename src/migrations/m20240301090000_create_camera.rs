//! Migration: Create Camera
//! Version: 20240301090000
//! Description: Camera registry referenced by items

use crate::executor::DbError;
use crate::migration::{Migration, SchemaManager};
use sea_query::{ColumnDef, Expr, Table};

pub struct CreateCamera;

impl Migration for CreateCamera {
    fn name(&self) -> &str {
        "create_camera"
    }

    fn version(&self) -> i64 {
        20240301090000
    }

    fn source(&self) -> &'static str {
        include_str!("m20240301090000_create_camera.rs")
    }

    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        let table = Table::create()
            .table("camera")
            .if_not_exists()
            .col(
                ColumnDef::new("camera_id")
                    .big_integer()
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new("label").string_len(255).null())
            .col(
                ColumnDef::new("created_at")
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .to_owned();
        manager.create_table(table)
    }
}
