//! Field-level validation for tags and items.
//!
//! Each check returns `InventoryError::Validation` naming the offending field so the HTTP
//! layer can report it as `errors.<field>`.

use crate::error::InventoryError;
use crate::model::{Item, ItemPatch, NewItem};
use chrono::{DateTime, NaiveDate};

pub const INVALID_RFID: &str = "Invalid RFID value";
pub const INVALID_WEIGHT: &str = "Invalid weight value";
pub const INVALID_THRESHOLD: &str = "Invalid threshold value";
pub const INVALID_CATEGORY: &str = "Category is required";
pub const EXPIRY_REQUIRED: &str = "Expiry date is required for perishable items";
pub const INVALID_EXPIRY: &str = "Invalid expiry date format";

type Result<T> = std::result::Result<T, InventoryError>;

pub fn validate_rfid(rfid: i64) -> Result<()> {
    if rfid > 0 {
        Ok(())
    } else {
        Err(InventoryError::validation("rfid", INVALID_RFID))
    }
}

fn validate_positive(value: f64, field: &'static str, message: &str) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InventoryError::validation(field, message))
    }
}

pub fn validate_weight(weight: f64) -> Result<()> {
    validate_positive(weight, "weight", INVALID_WEIGHT)
}

pub fn validate_threshold(threshold: f64) -> Result<()> {
    validate_positive(threshold, "threshold", INVALID_THRESHOLD)
}

pub fn validate_category(category: &str) -> Result<()> {
    if category.trim().is_empty() {
        Err(InventoryError::validation("category", INVALID_CATEGORY))
    } else {
        Ok(())
    }
}

/// Perishable items must carry an expiry date.
pub fn require_expiry_date(perishable: bool, expiry_date: Option<NaiveDate>) -> Result<()> {
    if perishable && expiry_date.is_none() {
        Err(InventoryError::validation("expiry_date", EXPIRY_REQUIRED))
    } else {
        Ok(())
    }
}

/// Parse `YYYY-MM-DD`, or take the date part of an RFC 3339 timestamp.
pub fn parse_expiry_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|ts| ts.date_naive()))
        .map_err(|_| InventoryError::validation("expiry_date", INVALID_EXPIRY))
}

pub fn validate_new_item(item: &NewItem) -> Result<()> {
    validate_weight(item.weight)?;
    validate_threshold(item.threshold)?;
    require_expiry_date(item.perishable, item.expiry_date)?;
    validate_category(&item.category)?;
    validate_rfid(item.rfid)
}

/// Validate the supplied fields of `patch` against the stored `current` record.
pub fn validate_patch(patch: &ItemPatch, current: &Item) -> Result<()> {
    if let Some(weight) = patch.weight {
        validate_weight(weight)?;
    }
    if let Some(threshold) = patch.threshold {
        validate_threshold(threshold)?;
    }
    if let Some(expiry_date) = patch.expiry_date {
        require_expiry_date(current.perishable, expiry_date)?;
    }
    if let Some(category) = &patch.category {
        validate_category(category)?;
    }
    Ok(())
}
