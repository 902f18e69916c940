//! Storage for tags, items and the camera registry.
//!
//! Every mutation the registry and ledger perform runs inside one `InventoryTx`. A
//! transaction that is dropped without `commit` leaves no trace, so an early `?` return
//! from a lifecycle operation never half-applies a two-step write.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::InventoryError;
use crate::model::{Item, ItemChanges, ItemQuery, NewItem, Tag};
use chrono::{DateTime, NaiveDate, Utc};

/// Lookup into the camera registry.
pub trait CameraRegistry {
    fn camera_exists(&self, camera_id: i64) -> Result<bool, InventoryError>;
}

/// Row-level operations inside one open transaction.
///
/// `lock = true` on a lookup holds the row until the transaction ends, so two requests
/// racing for the same tag or item are serialised.
pub trait InventoryTx: CameraRegistry {
    fn find_tag(&mut self, rfid: i64, lock: bool) -> Result<Option<Tag>, InventoryError>;

    /// Insert an unused tag; `DuplicateTag` if the rfid exists.
    fn insert_tag(&mut self, rfid: i64) -> Result<Tag, InventoryError>;

    /// Returns false when no such tag exists.
    fn set_tag_used(&mut self, rfid: i64, used: bool) -> Result<bool, InventoryError>;

    fn delete_tag(&mut self, rfid: i64) -> Result<bool, InventoryError>;

    /// All tags ordered by rfid.
    fn list_tags(&mut self) -> Result<Vec<Tag>, InventoryError>;

    /// Insert an item with a store-assigned id.
    fn insert_item(
        &mut self,
        item: &NewItem,
        timestamp_in: DateTime<Utc>,
    ) -> Result<Item, InventoryError>;

    fn find_item(&mut self, id: i64, lock: bool) -> Result<Option<Item>, InventoryError>;

    /// Apply `changes` and return the stored record, or `None` if the item is gone.
    fn update_item(
        &mut self,
        id: i64,
        changes: &ItemChanges,
    ) -> Result<Option<Item>, InventoryError>;

    fn delete_item(&mut self, id: i64) -> Result<bool, InventoryError>;

    /// One page of matching items plus the total number of matches.
    fn list_items(
        &mut self,
        query: &ItemQuery,
        today: NaiveDate,
    ) -> Result<(Vec<Item>, u64), InventoryError>;

    /// In-stock perishable items expiring before `today`, soonest first.
    fn list_expired(&mut self, today: NaiveDate) -> Result<Vec<Item>, InventoryError>;

    fn commit(self) -> Result<(), InventoryError>;
}

/// A backend able to open inventory transactions.
pub trait InventoryStore: Send + Sync + 'static {
    type Tx<'a>: InventoryTx
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Tx<'_>, InventoryError>;

    /// Round trip to the backend; returns its notion of the current time.
    fn ping(&self) -> Result<DateTime<Utc>, InventoryError>;
}

/// Run `f` in a fresh transaction and commit if it succeeds.
///
/// On error the transaction is dropped, which rolls it back.
pub fn with_transaction<'s, S, T, F>(store: &'s S, f: F) -> Result<T, InventoryError>
where
    S: InventoryStore,
    F: FnOnce(&mut S::Tx<'s>) -> Result<T, InventoryError>,
{
    let mut tx = store.begin()?;
    let value = f(&mut tx)?;
    tx.commit()?;
    Ok(value)
}
