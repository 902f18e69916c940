//! Tag and item lifecycle across the registry and the ledger.

use chrono::NaiveDate;
use std::sync::Arc;
use std::thread;
use stockguard::model::{Item, ItemPatch, ItemQuery, NewItem};
use stockguard::{ErrorKind, InventoryError, ItemLedger, MemoryStore, TagRegistry};

struct Warehouse {
    tags: TagRegistry<MemoryStore>,
    ledger: ItemLedger<MemoryStore>,
}

fn warehouse() -> Warehouse {
    let store = Arc::new(MemoryStore::with_cameras([101, 102]));
    Warehouse {
        tags: TagRegistry::new(Arc::clone(&store)),
        ledger: ItemLedger::new(store),
    }
}

fn dry_goods(rfid: i64) -> NewItem {
    NewItem {
        category: "Dry Goods".to_string(),
        perishable: false,
        weight: 1.5,
        dry: true,
        fragile: false,
        threshold: 3.0,
        expiry_date: None,
        camera_id: 101,
        rfid,
    }
}

/// A tag is in use exactly when an in-stock item is bound to it.
fn assert_tags_consistent(w: &Warehouse) {
    let items: Vec<Item> = w
        .ledger
        .list(&ItemQuery::default().limit(100))
        .unwrap()
        .items;
    for tag in w.tags.list().unwrap() {
        let bound = items
            .iter()
            .filter(|i| i.is_in_stock() && i.rfid == Some(tag.rfid))
            .count();
        assert!(bound <= 1, "tag {} bound to {} items", tag.rfid, bound);
        assert_eq!(tag.used, bound == 1, "tag {}", tag.rfid);
    }
}

#[test]
fn test_full_lifecycle_keeps_tags_consistent() {
    let w = warehouse();
    for rfid in [1001, 1002, 1003] {
        w.tags.register(rfid).unwrap();
    }
    assert_tags_consistent(&w);

    let first = w.ledger.register(dry_goods(1001)).unwrap();
    let second = w.ledger.register(dry_goods(1002)).unwrap();
    assert!(second.id > first.id);
    assert_tags_consistent(&w);

    w.ledger.checkout(first.id).unwrap();
    assert_tags_consistent(&w);

    let third = w.ledger.register(dry_goods(1001)).unwrap();
    assert_tags_consistent(&w);

    w.ledger.delete(second.id).unwrap();
    assert_tags_consistent(&w);

    w.tags.delete(1002).unwrap();
    w.ledger
        .update(
            third.id,
            ItemPatch {
                check_out: true,
                ..ItemPatch::default()
            },
        )
        .unwrap();
    assert_tags_consistent(&w);

    // a checked-out item keeps its history even after its tag is deleted
    w.tags.delete(1001).unwrap();
    let history = w.ledger.get(first.id).unwrap();
    assert!(!history.is_in_stock());
    assert_eq!(history.rfid, None);
}

#[test]
fn test_failed_registration_changes_nothing() {
    let w = warehouse();
    w.tags.register(1001).unwrap();

    let mut item = dry_goods(1001);
    item.camera_id = 999;
    let err = w.ledger.register(item).unwrap_err();
    assert!(matches!(err, InventoryError::CameraNotFound(999)));

    let mut item = dry_goods(1001);
    item.perishable = true;
    let err = w.ledger.register(item).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.field(), Some("expiry_date"));

    assert!(!w.tags.list().unwrap()[0].used);
    assert_eq!(w.ledger.list(&ItemQuery::default()).unwrap().total, 0);
}

#[test]
fn test_deleting_checked_out_item_leaves_reused_tag_bound() {
    let w = warehouse();
    w.tags.register(1001).unwrap();
    let old = w.ledger.register(dry_goods(1001)).unwrap();
    w.ledger.checkout(old.id).unwrap();
    let current = w.ledger.register(dry_goods(1001)).unwrap();

    w.ledger.delete(old.id).unwrap();

    assert!(w.tags.list().unwrap()[0].used);
    assert!(w.ledger.get(current.id).unwrap().is_in_stock());
    assert_tags_consistent(&w);
}

#[test]
fn test_expired_listing_excludes_non_perishables() {
    let w = warehouse();
    for rfid in [1001, 1002, 1003] {
        w.tags.register(rfid).unwrap();
    }
    let mut stale = dry_goods(1001);
    stale.perishable = true;
    stale.expiry_date = NaiveDate::from_ymd_opt(2000, 1, 1);
    let stale = w.ledger.register(stale).unwrap();

    let mut fresh = dry_goods(1002);
    fresh.perishable = true;
    fresh.expiry_date = NaiveDate::from_ymd_opt(2999, 1, 1);
    w.ledger.register(fresh).unwrap();

    let mut undated = dry_goods(1003);
    undated.expiry_date = NaiveDate::from_ymd_opt(2000, 1, 1);
    w.ledger.register(undated).unwrap();

    let expired = w.ledger.list_expired().unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, stale.id);
}

#[test]
fn test_concurrent_claims_on_one_tag() {
    let w = Arc::new(warehouse());
    w.tags.register(1001).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let w = Arc::clone(&w);
            thread::spawn(move || w.ledger.register(dry_goods(1001)))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(result, InventoryError::TagAlreadyInUse(1001)));
    }
    assert_tags_consistent(&w);
}
