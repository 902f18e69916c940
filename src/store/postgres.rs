//! PostgreSQL store over the connection pool.
//!
//! Each `PgTx` checks one connection out of the pool and holds it for the whole
//! transaction. Lookups with `lock = true` use `SELECT ... FOR UPDATE`.

use super::{CameraRegistry, InventoryStore, InventoryTx};
use crate::error::InventoryError;
use crate::executor::{DbError, SqlExecutor};
use crate::model::{Item, ItemChanges, ItemQuery, NewItem, Tag};
use crate::pool::DbPoolManager;
use crate::query::item_listing::{count_items, select_expired, select_items};
use crate::query::with_converted_params;
use crate::raw_sql::query_value;
use crate::transaction::Transaction;
use chrono::{DateTime, NaiveDate, Utc};
use may_postgres::Row;
use sea_query::{Expr, PostgresQueryBuilder, Query};

const ITEM_RETURNING: &str = "id, category, perishable, weight, dry, fragile, threshold, \
     expiry_date, timestamp_in, timestamp_out, camera_id, rfid";

/// Constraint names from the embedded migrations.
const TAGS_PKEY: &str = "rfid_tags_pkey";
const ITEMS_RFID_IN_STOCK: &str = "items_rfid_in_stock";
const ITEMS_RFID_FKEY: &str = "items_rfid_fkey";
const ITEMS_CAMERA_FKEY: &str = "items_camera_id_fkey";

#[derive(Clone)]
pub struct PgStore {
    pool: DbPoolManager,
}

impl PgStore {
    pub fn new(pool: DbPoolManager) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPoolManager {
        &self.pool
    }
}

impl InventoryStore for PgStore {
    type Tx<'a> = PgTx
    where
        Self: 'a;

    fn begin(&self) -> Result<PgTx, InventoryError> {
        let conn = self.pool.acquire().map_err(DbError::from)?;
        let tx = conn.begin().map_err(DbError::from)?;
        Ok(PgTx { tx })
    }

    fn ping(&self) -> Result<DateTime<Utc>, InventoryError> {
        let conn = self.pool.acquire().map_err(DbError::from)?;
        Ok(query_value(&conn, "SELECT NOW()", &[])?)
    }
}

pub struct PgTx {
    tx: Transaction,
}

fn tag_from_row(row: &Row) -> Result<Tag, DbError> {
    Ok(Tag {
        rfid: row.try_get("rfid")?,
        used: row.try_get("used")?,
    })
}

fn item_from_row(row: &Row) -> Result<Item, DbError> {
    Ok(Item {
        id: row.try_get("id")?,
        category: row.try_get("category")?,
        perishable: row.try_get("perishable")?,
        weight: row.try_get("weight")?,
        dry: row.try_get("dry")?,
        fragile: row.try_get("fragile")?,
        threshold: row.try_get("threshold")?,
        expiry_date: row.try_get("expiry_date")?,
        timestamp_in: row.try_get("timestamp_in")?,
        timestamp_out: row.try_get("timestamp_out")?,
        camera_id: row.try_get("camera_id")?,
        rfid: row.try_get("rfid")?,
    })
}

fn items_from_rows(rows: &[Row]) -> Result<Vec<Item>, InventoryError> {
    Ok(rows.iter().map(item_from_row).collect::<Result<_, _>>()?)
}

fn lock_clause(lock: bool) -> &'static str {
    if lock {
        " FOR UPDATE"
    } else {
        ""
    }
}

/// Map constraint violations on an item write to lifecycle errors.
fn classify_item_error(err: DbError, rfid: Option<i64>, camera_id: Option<i64>) -> InventoryError {
    let classified = match (err.constraint(), rfid, camera_id) {
        (Some(ITEMS_RFID_IN_STOCK), Some(rfid), _) if err.is_unique_violation() => {
            Some(InventoryError::TagAlreadyInUse(rfid))
        }
        (Some(ITEMS_RFID_FKEY), Some(rfid), _) if err.is_foreign_key_violation() => {
            Some(InventoryError::TagNotFound(rfid))
        }
        (Some(ITEMS_CAMERA_FKEY), _, Some(camera_id)) if err.is_foreign_key_violation() => {
            Some(InventoryError::CameraNotFound(camera_id))
        }
        _ => None,
    };
    classified.unwrap_or(InventoryError::Database(err))
}

impl CameraRegistry for PgTx {
    fn camera_exists(&self, camera_id: i64) -> Result<bool, InventoryError> {
        Ok(query_value(
            &self.tx,
            "SELECT EXISTS (SELECT 1 FROM camera WHERE camera_id = $1)",
            &[&camera_id],
        )?)
    }
}

impl InventoryTx for PgTx {
    fn find_tag(&mut self, rfid: i64, lock: bool) -> Result<Option<Tag>, InventoryError> {
        let sql = format!(
            "SELECT rfid, used FROM rfid_tags WHERE rfid = $1{}",
            lock_clause(lock)
        );
        let row = self.tx.query_opt(&sql, &[&rfid])?;
        Ok(row.as_ref().map(tag_from_row).transpose()?)
    }

    fn insert_tag(&mut self, rfid: i64) -> Result<Tag, InventoryError> {
        let row = self
            .tx
            .query_one(
                "INSERT INTO rfid_tags (rfid, used) VALUES ($1, false) RETURNING rfid, used",
                &[&rfid],
            )
            .map_err(|e| {
                if e.is_unique_violation() && e.constraint() == Some(TAGS_PKEY) {
                    InventoryError::DuplicateTag(rfid)
                } else {
                    InventoryError::Database(e)
                }
            })?;
        Ok(tag_from_row(&row)?)
    }

    fn set_tag_used(&mut self, rfid: i64, used: bool) -> Result<bool, InventoryError> {
        let updated = self.tx.execute(
            "UPDATE rfid_tags SET used = $2 WHERE rfid = $1",
            &[&rfid, &used],
        )?;
        Ok(updated > 0)
    }

    fn delete_tag(&mut self, rfid: i64) -> Result<bool, InventoryError> {
        let deleted = self
            .tx
            .execute("DELETE FROM rfid_tags WHERE rfid = $1", &[&rfid])?;
        Ok(deleted > 0)
    }

    fn list_tags(&mut self) -> Result<Vec<Tag>, InventoryError> {
        let rows = self
            .tx
            .query_all("SELECT rfid, used FROM rfid_tags ORDER BY rfid", &[])?;
        Ok(rows.iter().map(tag_from_row).collect::<Result<_, _>>()?)
    }

    fn insert_item(
        &mut self,
        item: &NewItem,
        timestamp_in: DateTime<Utc>,
    ) -> Result<Item, InventoryError> {
        let sql = format!(
            "INSERT INTO items (category, perishable, weight, dry, fragile, threshold, \
             expiry_date, timestamp_in, camera_id, rfid) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {ITEM_RETURNING}"
        );
        let row = self
            .tx
            .query_one(
                &sql,
                &[
                    &item.category,
                    &item.perishable,
                    &item.weight,
                    &item.dry,
                    &item.fragile,
                    &item.threshold,
                    &item.expiry_date,
                    &timestamp_in,
                    &item.camera_id,
                    &item.rfid,
                ],
            )
            .map_err(|e| classify_item_error(e, Some(item.rfid), Some(item.camera_id)))?;
        Ok(item_from_row(&row)?)
    }

    fn find_item(&mut self, id: i64, lock: bool) -> Result<Option<Item>, InventoryError> {
        let sql = format!(
            "SELECT {ITEM_RETURNING} FROM items WHERE id = $1{}",
            lock_clause(lock)
        );
        let row = self.tx.query_opt(&sql, &[&id])?;
        Ok(row.as_ref().map(item_from_row).transpose()?)
    }

    fn update_item(
        &mut self,
        id: i64,
        changes: &ItemChanges,
    ) -> Result<Option<Item>, InventoryError> {
        let mut update = Query::update();
        update.table("items");
        if let Some(category) = &changes.category {
            update.value("category", category.as_str());
        }
        if let Some(weight) = changes.weight {
            update.value("weight", weight);
        }
        if let Some(dry) = changes.dry {
            update.value("dry", dry);
        }
        if let Some(fragile) = changes.fragile {
            update.value("fragile", fragile);
        }
        if let Some(threshold) = changes.threshold {
            update.value("threshold", threshold);
        }
        if let Some(expiry_date) = changes.expiry_date {
            update.value("expiry_date", expiry_date);
        }
        if let Some(camera_id) = changes.camera_id {
            update.value("camera_id", camera_id);
        }
        if let Some(timestamp_out) = changes.timestamp_out {
            update.value("timestamp_out", timestamp_out);
        }
        update.and_where(Expr::col("id").eq(id)).returning_all();

        let (sql, values) = update.build(PostgresQueryBuilder);
        let tx = &self.tx;
        let row = with_converted_params(&values, |params| tx.query_opt(&sql, params))
            .map_err(|e| classify_item_error(e, None, changes.camera_id))?;
        Ok(row.as_ref().map(item_from_row).transpose()?)
    }

    fn delete_item(&mut self, id: i64) -> Result<bool, InventoryError> {
        let deleted = self.tx.execute("DELETE FROM items WHERE id = $1", &[&id])?;
        Ok(deleted > 0)
    }

    fn list_items(
        &mut self,
        query: &ItemQuery,
        today: NaiveDate,
    ) -> Result<(Vec<Item>, u64), InventoryError> {
        let tx = &self.tx;

        let (count_sql, count_values) = count_items(query, today);
        let total: i64 = with_converted_params(&count_values, |params| {
            query_value(tx, &count_sql, params)
        })?;

        let (sql, values) = select_items(query, today);
        let rows = with_converted_params(&values, |params| tx.query_all(&sql, params))?;

        Ok((items_from_rows(&rows)?, u64::try_from(total).unwrap_or(0)))
    }

    fn list_expired(&mut self, today: NaiveDate) -> Result<Vec<Item>, InventoryError> {
        let (sql, values) = select_expired(today);
        let tx = &self.tx;
        let rows = with_converted_params(&values, |params| tx.query_all(&sql, params))?;
        items_from_rows(&rows)
    }

    fn commit(self) -> Result<(), InventoryError> {
        self.tx.commit().map_err(DbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_clause() {
        assert_eq!(lock_clause(true), " FOR UPDATE");
        assert_eq!(lock_clause(false), "");
    }

    #[test]
    fn test_unclassified_errors_stay_internal() {
        let err = classify_item_error(DbError::Query("boom".to_string()), Some(1), Some(2));
        assert!(matches!(err, InventoryError::Database(_)));
    }
}
