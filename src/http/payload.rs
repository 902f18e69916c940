//! JSON request bodies.
//!
//! Numbers are accepted as JSON numbers or numeric strings, flags as JSON booleans or
//! the strings `"true"` / `"false"`. A malformed field is reported as a validation
//! error on that field.

use crate::error::InventoryError;
use crate::model::{ItemPatch, NewItem};
use crate::validation::{
    parse_expiry_date, INVALID_CATEGORY, INVALID_EXPIRY, INVALID_RFID, INVALID_THRESHOLD,
    INVALID_WEIGHT,
};
use chrono::NaiveDate;
use serde_json::{Map, Value};

pub const INVALID_BODY: &str = "Request body must be a JSON object";
pub const INVALID_CAMERA_ID: &str = "Invalid camera ID";

type Result<T> = std::result::Result<T, InventoryError>;

fn object(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(InventoryError::validation("body", INVALID_BODY)),
    }
}

/// Present and not `null`.
fn field<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.get(name).filter(|v| !v.is_null())
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

fn number(value: &Value, name: &'static str, message: &str) -> Result<f64> {
    as_number(value).ok_or_else(|| InventoryError::validation(name, message))
}

fn integer(value: &Value, name: &'static str, message: &str) -> Result<i64> {
    as_integer(value).ok_or_else(|| InventoryError::validation(name, message))
}

fn flag(value: &Value, name: &'static str) -> Result<bool> {
    as_flag(value).ok_or_else(|| InventoryError::validation(name, format!("Invalid {name} value")))
}

fn text(value: &Value, name: &'static str, message: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| InventoryError::validation(name, message))
}

/// `null` or `""` clears the date.
fn expiry(value: Option<&Value>) -> Result<Option<NaiveDate>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_expiry_date(s).map(Some),
        Some(_) => Err(InventoryError::validation("expiry_date", INVALID_EXPIRY)),
    }
}

/// `{"rfid": 1001}` from `POST /api/rfid/register`.
pub fn tag_registration(body: &[u8]) -> Result<i64> {
    let map = object(body)?;
    field(&map, "rfid")
        .and_then(as_integer)
        .ok_or_else(|| InventoryError::validation("rfid", INVALID_RFID))
}

/// Body of `POST /api/items`.
pub fn new_item(body: &[u8]) -> Result<NewItem> {
    let map = object(body)?;
    let required_number = |name: &'static str, message: &str| {
        field(&map, name)
            .ok_or_else(|| InventoryError::validation(name, message))
            .and_then(|v| number(v, name, message))
    };
    let optional_flag = |name: &'static str| {
        field(&map, name)
            .map(|v| flag(v, name))
            .transpose()
            .map(Option::unwrap_or_default)
    };

    let weight = required_number("weight", INVALID_WEIGHT)?;
    let threshold = required_number("threshold", INVALID_THRESHOLD)?;
    let perishable = optional_flag("perishable")?;
    let expiry_date = expiry(map.get("expiry_date"))?;
    let category = field(&map, "category")
        .map(|v| text(v, "category", INVALID_CATEGORY))
        .transpose()?
        .unwrap_or_default();
    let camera_id = field(&map, "camera_id")
        .ok_or_else(|| InventoryError::validation("camera_id", INVALID_CAMERA_ID))
        .and_then(|v| integer(v, "camera_id", INVALID_CAMERA_ID))?;
    let rfid = field(&map, "rfid")
        .ok_or_else(|| InventoryError::validation("rfid", INVALID_RFID))
        .and_then(|v| integer(v, "rfid", INVALID_RFID))?;

    Ok(NewItem {
        category,
        perishable,
        weight,
        dry: optional_flag("dry")?,
        fragile: optional_flag("fragile")?,
        threshold,
        expiry_date,
        camera_id,
        rfid,
    })
}

/// Body of `PUT /api/items/:id`.
///
/// Unknown fields are ignored. `timestamp_out` only checks the item out when it is the
/// boolean `true`; any other value is treated as absent.
pub fn item_patch(body: &[u8]) -> Result<ItemPatch> {
    let map = object(body)?;

    let mut patch = ItemPatch::default();
    if let Some(v) = field(&map, "category") {
        patch.category = Some(text(v, "category", INVALID_CATEGORY)?);
    }
    if let Some(v) = field(&map, "weight") {
        patch.weight = Some(number(v, "weight", INVALID_WEIGHT)?);
    }
    if let Some(v) = field(&map, "threshold") {
        patch.threshold = Some(number(v, "threshold", INVALID_THRESHOLD)?);
    }
    if let Some(v) = field(&map, "dry") {
        patch.dry = Some(flag(v, "dry")?);
    }
    if let Some(v) = field(&map, "fragile") {
        patch.fragile = Some(flag(v, "fragile")?);
    }
    if map.contains_key("expiry_date") {
        patch.expiry_date = Some(expiry(map.get("expiry_date"))?);
    }
    if let Some(v) = field(&map, "camera_id") {
        patch.camera_id = Some(integer(v, "camera_id", INVALID_CAMERA_ID)?);
    }
    patch.check_out = matches!(map.get("timestamp_out"), Some(Value::Bool(true)));
    Ok(patch)
}
