//! Item Ledger: item records and their binding to RFID tags.
//!
//! An item is in stock until it is checked out, which happens at most once. While in
//! stock its tag is marked used; every operation that changes that binding writes the
//! item and the tag in the same transaction.

use crate::error::InventoryError;
use crate::metrics::record_event;
use crate::model::{Item, ItemChanges, ItemPage, ItemPatch, ItemQuery, NewItem, UpdateOutcome};
use crate::registry::{claim, release};
use crate::store::{with_transaction, InventoryStore};
use crate::validation::{validate_new_item, validate_patch};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Source of the current time. Tests pin it to make expiry deterministic.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct ItemLedger<S> {
    store: Arc<S>,
    clock: Clock,
}

impl<S> Clone for ItemLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: InventoryStore> ItemLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(Utc::now))
    }

    pub fn with_clock(store: Arc<S>, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// The UTC date expiry is measured against.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Register an item and claim its tag.
    ///
    /// # Errors
    ///
    /// `Validation` for bad fields, `TagNotFound` / `TagAlreadyInUse` for the tag,
    /// `CameraNotFound` for an unknown camera. Nothing is written on error.
    pub fn register(&self, item: NewItem) -> Result<Item, InventoryError> {
        validate_new_item(&item)?;
        let timestamp_in = self.now();

        let created = with_transaction(&*self.store, |tx| {
            claim(tx, item.rfid)?;
            if !tx.camera_exists(item.camera_id)? {
                return Err(InventoryError::CameraNotFound(item.camera_id));
            }
            tx.insert_item(&item, timestamp_in)
        })?;

        log::info!(
            "Registered item {} ({}) with RFID tag {}",
            created.id,
            created.category,
            item.rfid
        );
        record_event("item_registered");
        Ok(created)
    }

    /// Apply the supplied fields of `patch`.
    ///
    /// A patch without any recognised field returns the stored record unchanged.
    /// `check_out` sets `timestamp_out` and releases the item's tag.
    ///
    /// # Errors
    ///
    /// `ItemNotFound`, `Validation`, `CameraNotFound` when moving to an unknown camera,
    /// `ItemAlreadyCheckedOut` when checking out twice.
    pub fn update(&self, id: i64, patch: ItemPatch) -> Result<UpdateOutcome, InventoryError> {
        let now = self.now();
        let check_out = patch.check_out;

        let outcome = with_transaction(&*self.store, |tx| {
            let current = tx
                .find_item(id, true)?
                .ok_or(InventoryError::ItemNotFound(id))?;
            if patch.is_empty() {
                return Ok(UpdateOutcome {
                    item: current,
                    changed: false,
                });
            }

            validate_patch(&patch, &current)?;
            if check_out && !current.is_in_stock() {
                return Err(InventoryError::ItemAlreadyCheckedOut(id));
            }
            if let Some(camera_id) = patch.camera_id {
                if camera_id != current.camera_id && !tx.camera_exists(camera_id)? {
                    return Err(InventoryError::CameraNotFound(camera_id));
                }
            }

            let changes = ItemChanges::from_patch(patch, now);
            let item = tx
                .update_item(id, &changes)?
                .ok_or(InventoryError::ItemNotFound(id))?;
            if check_out {
                if let Some(rfid) = current.rfid {
                    release(tx, rfid)?;
                }
            }
            Ok(UpdateOutcome {
                item,
                changed: true,
            })
        })?;

        if outcome.changed {
            if check_out {
                log::info!("Checked out item {}", id);
                record_event("item_checked_out");
            } else {
                log::debug!("Updated item {}", id);
                record_event("item_updated");
            }
        }
        Ok(outcome)
    }

    /// Check an in-stock item out now.
    pub fn checkout(&self, id: i64) -> Result<Item, InventoryError> {
        let patch = ItemPatch {
            check_out: true,
            ..ItemPatch::default()
        };
        self.update(id, patch).map(|outcome| outcome.item)
    }

    pub fn get(&self, id: i64) -> Result<Item, InventoryError> {
        with_transaction(&*self.store, |tx| tx.find_item(id, false))?
            .ok_or(InventoryError::ItemNotFound(id))
    }

    /// One page of items matching `query`.
    pub fn list(&self, query: &ItemQuery) -> Result<ItemPage, InventoryError> {
        let today = self.today();
        let (items, total) = with_transaction(&*self.store, |tx| tx.list_items(query, today))?;
        Ok(ItemPage::new(items, total, query))
    }

    /// In-stock perishable items past their expiry date, soonest first.
    pub fn list_expired(&self) -> Result<Vec<Item>, InventoryError> {
        let today = self.today();
        with_transaction(&*self.store, |tx| tx.list_expired(today))
    }

    /// Delete an item, releasing its tag if it was still in stock.
    ///
    /// Returns the deleted record.
    pub fn delete(&self, id: i64) -> Result<Item, InventoryError> {
        let deleted = with_transaction(&*self.store, |tx| {
            let item = tx
                .find_item(id, true)?
                .ok_or(InventoryError::ItemNotFound(id))?;
            tx.delete_item(id)?;
            if item.is_in_stock() {
                if let Some(rfid) = item.rfid {
                    release(tx, rfid)?;
                }
            }
            Ok(item)
        })?;

        log::info!("Deleted item {}", id);
        record_event("item_deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tag;
    use crate::registry::TagRegistry;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    struct Fixture {
        tags: TagRegistry<MemoryStore>,
        ledger: ItemLedger<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::with_cameras([101, 102]));
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        Fixture {
            tags: TagRegistry::new(Arc::clone(&store)),
            ledger: ItemLedger::with_clock(store, Arc::new(move || now)),
        }
    }

    fn new_item(rfid: i64) -> NewItem {
        NewItem {
            category: "Food".to_string(),
            perishable: true,
            weight: 5.0,
            dry: false,
            fragile: false,
            threshold: 2.0,
            expiry_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            camera_id: 101,
            rfid,
        }
    }

    fn tag(f: &Fixture, rfid: i64) -> Tag {
        f.tags
            .list()
            .unwrap()
            .into_iter()
            .find(|t| t.rfid == rfid)
            .unwrap()
    }

    #[test]
    fn test_register_claims_tag() {
        let f = fixture();
        f.tags.register(1001).unwrap();
        let item = f.ledger.register(new_item(1001)).unwrap();
        assert_eq!(item.rfid, Some(1001));
        assert_eq!(item.timestamp_in, f.ledger.now());
        assert!(item.is_in_stock());
        assert!(tag(&f, 1001).used);
    }

    #[test]
    fn test_register_with_used_tag_creates_nothing() {
        let f = fixture();
        f.tags.register(1001).unwrap();
        f.ledger.register(new_item(1001)).unwrap();
        let err = f.ledger.register(new_item(1001)).unwrap_err();
        assert!(matches!(err, InventoryError::TagAlreadyInUse(1001)));
        assert_eq!(f.ledger.list(&ItemQuery::default()).unwrap().total, 1);
    }

    #[test]
    fn test_register_unknown_camera_leaves_tag_free() {
        let f = fixture();
        f.tags.register(1001).unwrap();
        let mut item = new_item(1001);
        item.camera_id = 999;
        let err = f.ledger.register(item).unwrap_err();
        assert!(matches!(err, InventoryError::CameraNotFound(999)));
        assert!(!tag(&f, 1001).used);
    }

    #[test]
    fn test_register_unknown_tag() {
        let f = fixture();
        let err = f.ledger.register(new_item(5)).unwrap_err();
        assert!(matches!(err, InventoryError::TagNotFound(5)));
    }

    #[test]
    fn test_perishable_requires_expiry() {
        let f = fixture();
        f.tags.register(1001).unwrap();
        let mut item = new_item(1001);
        item.expiry_date = None;
        let err = f.ledger.register(item).unwrap_err();
        assert_eq!(err.field(), Some("expiry_date"));
    }

    #[test]
    fn test_checkout_releases_tag_once() {
        let f = fixture();
        f.tags.register(1001).unwrap();
        let item = f.ledger.register(new_item(1001)).unwrap();

        let out = f.ledger.checkout(item.id).unwrap();
        assert_eq!(out.timestamp_out, Some(f.ledger.now()));
        assert!(!tag(&f, 1001).used);

        // The tag can now go to another item; a second checkout must not free it.
        f.ledger.register(new_item(1001)).unwrap();
        let err = f.ledger.checkout(item.id).unwrap_err();
        assert!(matches!(err, InventoryError::ItemAlreadyCheckedOut(_)));
        assert!(tag(&f, 1001).used);
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let f = fixture();
        f.tags.register(1001).unwrap();
        let item = f.ledger.register(new_item(1001)).unwrap();
        let outcome = f.ledger.update(item.id, ItemPatch::default()).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.item, item);
    }

    #[test]
    fn test_update_supplied_fields_only() {
        let f = fixture();
        f.tags.register(1001).unwrap();
        let item = f.ledger.register(new_item(1001)).unwrap();
        let patch = ItemPatch {
            weight: Some(7.5),
            camera_id: Some(102),
            ..ItemPatch::default()
        };
        let updated = f.ledger.update(item.id, patch).unwrap().item;
        assert_eq!(updated.weight, 7.5);
        assert_eq!(updated.camera_id, 102);
        assert_eq!(updated.category, item.category);
        assert!(updated.is_in_stock());
    }

    #[test]
    fn test_update_rejects_unknown_camera_and_bad_weight() {
        let f = fixture();
        f.tags.register(1001).unwrap();
        let item = f.ledger.register(new_item(1001)).unwrap();

        let patch = ItemPatch {
            camera_id: Some(999),
            ..ItemPatch::default()
        };
        assert!(matches!(
            f.ledger.update(item.id, patch).unwrap_err(),
            InventoryError::CameraNotFound(999)
        ));

        let patch = ItemPatch {
            weight: Some(0.0),
            ..ItemPatch::default()
        };
        assert_eq!(f.ledger.update(item.id, patch).unwrap_err().field(), Some("weight"));
        assert_eq!(f.ledger.get(item.id).unwrap(), item);
    }

    #[test]
    fn test_update_missing_item() {
        let f = fixture();
        let err = f.ledger.update(42, ItemPatch::default()).unwrap_err();
        assert!(matches!(err, InventoryError::ItemNotFound(42)));
    }

    #[test]
    fn test_delete_releases_in_stock_tag() {
        let f = fixture();
        f.tags.register(1001).unwrap();
        let item = f.ledger.register(new_item(1001)).unwrap();
        f.ledger.delete(item.id).unwrap();
        assert!(!tag(&f, 1001).used);
        assert!(matches!(
            f.ledger.get(item.id).unwrap_err(),
            InventoryError::ItemNotFound(_)
        ));
        f.tags.delete(1001).unwrap();
    }

    #[test]
    fn test_delete_checked_out_item_keeps_new_binding() {
        let f = fixture();
        f.tags.register(1001).unwrap();
        let old = f.ledger.register(new_item(1001)).unwrap();
        f.ledger.checkout(old.id).unwrap();
        f.ledger.register(new_item(1001)).unwrap();

        f.ledger.delete(old.id).unwrap();
        assert!(tag(&f, 1001).used);
    }

    #[test]
    fn test_expired_listing() {
        let f = fixture();
        for rfid in [1, 2, 3] {
            f.tags.register(rfid).unwrap();
        }
        let expired = f.ledger.register(new_item(1)).unwrap();
        let mut fresh = new_item(2);
        fresh.expiry_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        f.ledger.register(fresh).unwrap();
        let gone = f.ledger.register(new_item(3)).unwrap();
        f.ledger.checkout(gone.id).unwrap();

        let ids: Vec<i64> = f.ledger.list_expired().unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![expired.id]);
    }
}
