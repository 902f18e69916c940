//! In-process store.
//!
//! One mutex serialises transactions. A transaction works on a copy of the state and
//! swaps it in on commit; dropping it discards the copy. Item ids come from a counter
//! guarded by the same mutex.

use super::{CameraRegistry, InventoryStore, InventoryTx};
use crate::error::InventoryError;
use crate::model::{Item, ItemChanges, ItemQuery, NewItem, SortField, SortOrder, Tag};
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tags: BTreeMap<i64, Tag>,
    items: BTreeMap<i64, Item>,
    cameras: BTreeSet<i64>,
    last_item_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose camera registry contains `camera_ids`.
    pub fn with_cameras(camera_ids: impl IntoIterator<Item = i64>) -> Self {
        let store = Self::new();
        store.add_cameras(camera_ids);
        store
    }

    pub fn add_cameras(&self, camera_ids: impl IntoIterator<Item = i64>) {
        self.lock().cameras.extend(camera_ids);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // state is only replaced wholesale on commit, so a poisoned lock still holds a
        // consistent snapshot
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InventoryStore for MemoryStore {
    type Tx<'a> = MemoryTx<'a>
    where
        Self: 'a;

    fn begin(&self) -> Result<MemoryTx<'_>, InventoryError> {
        let guard = self.lock();
        let work = guard.clone();
        Ok(MemoryTx { guard, work })
    }

    fn ping(&self) -> Result<DateTime<Utc>, InventoryError> {
        Ok(Utc::now())
    }
}

pub struct MemoryTx<'a> {
    guard: MutexGuard<'a, MemoryState>,
    work: MemoryState,
}

impl CameraRegistry for MemoryTx<'_> {
    fn camera_exists(&self, camera_id: i64) -> Result<bool, InventoryError> {
        Ok(self.work.cameras.contains(&camera_id))
    }
}

impl InventoryTx for MemoryTx<'_> {
    fn find_tag(&mut self, rfid: i64, _lock: bool) -> Result<Option<Tag>, InventoryError> {
        Ok(self.work.tags.get(&rfid).copied())
    }

    fn insert_tag(&mut self, rfid: i64) -> Result<Tag, InventoryError> {
        if self.work.tags.contains_key(&rfid) {
            return Err(InventoryError::DuplicateTag(rfid));
        }
        let tag = Tag::new(rfid);
        self.work.tags.insert(rfid, tag);
        Ok(tag)
    }

    fn set_tag_used(&mut self, rfid: i64, used: bool) -> Result<bool, InventoryError> {
        match self.work.tags.get_mut(&rfid) {
            Some(tag) => {
                tag.used = used;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_tag(&mut self, rfid: i64) -> Result<bool, InventoryError> {
        if self.work.tags.remove(&rfid).is_none() {
            return Ok(false);
        }
        // ON DELETE SET NULL
        for item in self.work.items.values_mut() {
            if item.rfid == Some(rfid) {
                item.rfid = None;
            }
        }
        Ok(true)
    }

    fn list_tags(&mut self) -> Result<Vec<Tag>, InventoryError> {
        Ok(self.work.tags.values().copied().collect())
    }

    fn insert_item(
        &mut self,
        item: &NewItem,
        timestamp_in: DateTime<Utc>,
    ) -> Result<Item, InventoryError> {
        if !self.work.tags.contains_key(&item.rfid) {
            return Err(InventoryError::TagNotFound(item.rfid));
        }
        if !self.work.cameras.contains(&item.camera_id) {
            return Err(InventoryError::CameraNotFound(item.camera_id));
        }
        let rfid_taken = self
            .work
            .items
            .values()
            .any(|existing| existing.is_in_stock() && existing.rfid == Some(item.rfid));
        if rfid_taken {
            return Err(InventoryError::TagAlreadyInUse(item.rfid));
        }

        self.work.last_item_id += 1;
        let stored = Item {
            id: self.work.last_item_id,
            category: item.category.clone(),
            perishable: item.perishable,
            weight: item.weight,
            dry: item.dry,
            fragile: item.fragile,
            threshold: item.threshold,
            expiry_date: item.expiry_date,
            timestamp_in,
            timestamp_out: None,
            camera_id: item.camera_id,
            rfid: Some(item.rfid),
        };
        self.work.items.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn find_item(&mut self, id: i64, _lock: bool) -> Result<Option<Item>, InventoryError> {
        Ok(self.work.items.get(&id).cloned())
    }

    fn update_item(
        &mut self,
        id: i64,
        changes: &ItemChanges,
    ) -> Result<Option<Item>, InventoryError> {
        if let Some(camera_id) = changes.camera_id {
            if !self.work.cameras.contains(&camera_id) {
                return Err(InventoryError::CameraNotFound(camera_id));
            }
        }
        Ok(self.work.items.get_mut(&id).map(|item| {
            item.apply(changes);
            item.clone()
        }))
    }

    fn delete_item(&mut self, id: i64) -> Result<bool, InventoryError> {
        Ok(self.work.items.remove(&id).is_some())
    }

    fn list_items(
        &mut self,
        query: &ItemQuery,
        today: NaiveDate,
    ) -> Result<(Vec<Item>, u64), InventoryError> {
        let mut matching: Vec<&Item> = self
            .work
            .items
            .values()
            .filter(|item| matches_filters(item, query, today))
            .collect();
        matching.sort_by(|a, b| compare_items(a, b, query.sort_by, query.sort_order));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.page_size()).unwrap_or(usize::MAX);
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, total))
    }

    fn list_expired(&mut self, today: NaiveDate) -> Result<Vec<Item>, InventoryError> {
        let mut expired: Vec<Item> = self
            .work
            .items
            .values()
            .filter(|item| item.is_in_stock() && item.is_expired(today))
            .cloned()
            .collect();
        expired.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date).then(a.id.cmp(&b.id)));
        Ok(expired)
    }

    fn commit(mut self) -> Result<(), InventoryError> {
        *self.guard = std::mem::take(&mut self.work);
        Ok(())
    }
}

fn matches_filters(item: &Item, query: &ItemQuery, today: NaiveDate) -> bool {
    if let Some(category) = &query.category {
        if &item.category != category {
            return false;
        }
    }
    if let Some(perishable) = query.perishable {
        if item.perishable != perishable {
            return false;
        }
    }
    match query.expired {
        Some(true) => item.is_in_stock() && item.is_expired(today),
        Some(false) => !item.is_expired(today),
        None => true,
    }
}

/// Postgres ordering: NULLs sort last ascending and first descending. Ties break on id.
fn compare_items(a: &Item, b: &Item, field: SortField, order: SortOrder) -> Ordering {
    let primary = match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Category => a.category.cmp(&b.category),
        SortField::Weight => a.weight.total_cmp(&b.weight),
        SortField::TimestampIn => a.timestamp_in.cmp(&b.timestamp_in),
        SortField::ExpiryDate => match (a.expiry_date, b.expiry_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };
    let primary = match order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary.then(a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_item(rfid: i64) -> NewItem {
        NewItem {
            category: "Food".to_string(),
            perishable: false,
            weight: 1.0,
            dry: true,
            fragile: false,
            threshold: 1.0,
            expiry_date: None,
            camera_id: 101,
            rfid,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_dropped_transaction_leaves_no_trace() {
        let store = MemoryStore::with_cameras([101]);
        {
            let mut tx = store.begin().unwrap();
            tx.insert_tag(1001).unwrap();
        }
        let mut tx = store.begin().unwrap();
        assert!(tx.find_tag(1001, false).unwrap().is_none());
    }

    #[test]
    fn test_committed_transaction_is_visible() {
        let store = MemoryStore::with_cameras([101]);
        let mut tx = store.begin().unwrap();
        tx.insert_tag(1001).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        assert_eq!(tx.find_tag(1001, false).unwrap(), Some(Tag::new(1001)));
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.insert_tag(7).unwrap();
        assert!(matches!(
            tx.insert_tag(7),
            Err(InventoryError::DuplicateTag(7))
        ));
    }

    #[test]
    fn test_ids_increase_and_are_not_reused() {
        let store = MemoryStore::with_cameras([101]);
        let mut tx = store.begin().unwrap();
        tx.insert_tag(1).unwrap();
        tx.insert_tag(2).unwrap();
        let first = tx.insert_item(&new_item(1), now()).unwrap();
        tx.delete_item(first.id).unwrap();
        let second = tx.insert_item(&new_item(2), now()).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_in_stock_rfid_is_unique() {
        let store = MemoryStore::with_cameras([101]);
        let mut tx = store.begin().unwrap();
        tx.insert_tag(1).unwrap();
        tx.insert_item(&new_item(1), now()).unwrap();
        assert!(matches!(
            tx.insert_item(&new_item(1), now()),
            Err(InventoryError::TagAlreadyInUse(1))
        ));
    }

    #[test]
    fn test_delete_tag_nulls_item_reference() {
        let store = MemoryStore::with_cameras([101]);
        let mut tx = store.begin().unwrap();
        tx.insert_tag(1).unwrap();
        let item = tx.insert_item(&new_item(1), now()).unwrap();
        tx.delete_tag(1).unwrap();
        assert_eq!(tx.find_item(item.id, false).unwrap().unwrap().rfid, None);
    }

    #[test]
    fn test_expiry_sort_puts_missing_dates_last() {
        let store = MemoryStore::with_cameras([101]);
        let mut tx = store.begin().unwrap();
        for rfid in 1..=3 {
            tx.insert_tag(rfid).unwrap();
        }
        tx.insert_item(&new_item(1), now()).unwrap();
        tx.insert_item(
            &NewItem {
                expiry_date: NaiveDate::from_ymd_opt(2024, 6, 1),
                ..new_item(2)
            },
            now(),
        )
        .unwrap();
        tx.insert_item(
            &NewItem {
                expiry_date: NaiveDate::from_ymd_opt(2024, 3, 1),
                ..new_item(3)
            },
            now(),
        )
        .unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let query = ItemQuery::default().sort(SortField::ExpiryDate, SortOrder::Asc);
        let (items, total) = tx.list_items(&query, today).unwrap();
        assert_eq!(total, 3);
        let rfids: Vec<_> = items.iter().map(|i| i.rfid).collect();
        assert_eq!(rfids, vec![Some(3), Some(2), Some(1)]);

        let query = query.sort(SortField::ExpiryDate, SortOrder::Desc);
        let (items, _) = tx.list_items(&query, today).unwrap();
        let rfids: Vec<_> = items.iter().map(|i| i.rfid).collect();
        assert_eq!(rfids, vec![Some(1), Some(2), Some(3)]);
    }
}
