use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// A stocked item.
///
/// An item starts in stock (`timestamp_out` is `None`) and moves to checked-out exactly
/// once. `rfid` is `None` only after the bound tag was deleted, which can happen once the
/// item is no longer in stock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: i64,
    pub category: String,
    pub perishable: bool,
    pub weight: f64,
    pub dry: bool,
    pub fragile: bool,
    pub threshold: f64,
    pub expiry_date: Option<NaiveDate>,
    pub timestamp_in: DateTime<Utc>,
    pub timestamp_out: Option<DateTime<Utc>>,
    pub camera_id: i64,
    pub rfid: Option<i64>,
}

impl Item {
    pub fn is_in_stock(&self) -> bool {
        self.timestamp_out.is_none()
    }

    /// Perishable with an expiry date strictly before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.perishable && self.expiry_date.is_some_and(|d| d < today)
    }

    /// Apply a validated change set in place.
    pub fn apply(&mut self, changes: &ItemChanges) {
        if let Some(category) = &changes.category {
            self.category = category.clone();
        }
        if let Some(weight) = changes.weight {
            self.weight = weight;
        }
        if let Some(dry) = changes.dry {
            self.dry = dry;
        }
        if let Some(fragile) = changes.fragile {
            self.fragile = fragile;
        }
        if let Some(threshold) = changes.threshold {
            self.threshold = threshold;
        }
        if let Some(expiry_date) = changes.expiry_date {
            self.expiry_date = expiry_date;
        }
        if let Some(camera_id) = changes.camera_id {
            self.camera_id = camera_id;
        }
        if let Some(timestamp_out) = changes.timestamp_out {
            self.timestamp_out = Some(timestamp_out);
        }
    }
}

/// Fields for registering an item. `timestamp_in` and `id` are assigned by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub category: String,
    pub perishable: bool,
    pub weight: f64,
    pub dry: bool,
    pub fragile: bool,
    pub threshold: f64,
    pub expiry_date: Option<NaiveDate>,
    pub camera_id: i64,
    pub rfid: i64,
}

/// A partial update as supplied by the caller.
///
/// `expiry_date` is `Some(None)` when the caller explicitly cleared the date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub category: Option<String>,
    pub weight: Option<f64>,
    pub dry: Option<bool>,
    pub fragile: Option<bool>,
    pub threshold: Option<f64>,
    pub expiry_date: Option<Option<NaiveDate>>,
    pub camera_id: Option<i64>,
    /// Check the item out now and release its tag
    pub check_out: bool,
}

impl ItemPatch {
    /// True when no recognised field was supplied.
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.weight.is_none()
            && self.dry.is_none()
            && self.fragile.is_none()
            && self.threshold.is_none()
            && self.expiry_date.is_none()
            && self.camera_id.is_none()
            && !self.check_out
    }
}

/// The column writes the ledger hands to the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemChanges {
    pub category: Option<String>,
    pub weight: Option<f64>,
    pub dry: Option<bool>,
    pub fragile: Option<bool>,
    pub threshold: Option<f64>,
    pub expiry_date: Option<Option<NaiveDate>>,
    pub camera_id: Option<i64>,
    pub timestamp_out: Option<DateTime<Utc>>,
}

impl ItemChanges {
    pub fn from_patch(patch: ItemPatch, now: DateTime<Utc>) -> Self {
        Self {
            category: patch.category,
            weight: patch.weight,
            dry: patch.dry,
            fragile: patch.fragile,
            threshold: patch.threshold,
            expiry_date: patch.expiry_date,
            camera_id: patch.camera_id,
            timestamp_out: patch.check_out.then_some(now),
        }
    }
}

/// Result of `ItemLedger::update`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub item: Item,
    /// False when the patch carried no recognised field
    pub changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Item {
        Item {
            id: 1,
            category: "Food".to_string(),
            perishable: true,
            weight: 5.0,
            dry: false,
            fragile: false,
            threshold: 2.0,
            expiry_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            timestamp_in: Utc.with_ymd_and_hms(2023, 12, 1, 8, 0, 0).unwrap(),
            timestamp_out: None,
            camera_id: 101,
            rfid: Some(1001),
        }
    }

    #[test]
    fn test_is_expired() {
        let item = sample();
        assert!(item.is_expired(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        assert!(!item.is_expired(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));

        let dry_goods = Item {
            perishable: false,
            ..sample()
        };
        assert!(!dry_goods.is_expired(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
    }

    #[test]
    fn test_apply_only_touches_supplied_fields() {
        let mut item = sample();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let changes = ItemChanges::from_patch(
            ItemPatch {
                weight: Some(7.5),
                check_out: true,
                ..ItemPatch::default()
            },
            now,
        );
        item.apply(&changes);

        assert_eq!(item.weight, 7.5);
        assert_eq!(item.timestamp_out, Some(now));
        assert_eq!(item.category, "Food");
        assert_eq!(item.expiry_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert!(!item.is_in_stock());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(ItemPatch::default().is_empty());
        assert!(!ItemPatch {
            check_out: true,
            ..ItemPatch::default()
        }
        .is_empty());
        assert!(!ItemPatch {
            expiry_date: Some(None),
            ..ItemPatch::default()
        }
        .is_empty());
    }

    #[test]
    fn test_item_serializes_dates_as_iso() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["expiry_date"], "2024-01-01");
        assert_eq!(json["timestamp_in"], "2023-12-01T08:00:00Z");
        assert!(json["timestamp_out"].is_null());
        assert_eq!(json["rfid"], 1001);
    }
}
