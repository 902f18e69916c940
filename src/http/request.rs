//! Request targets: path segments, query strings and path parameters.

use crate::error::InventoryError;
use crate::model::{ItemQuery, SortField, SortOrder, DEFAULT_LIMIT};
use crate::validation::INVALID_RFID;
use url::form_urlencoded;

pub const INVALID_ITEM_ID: &str = "Invalid item ID";

/// A request target split into its path and decoded query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Target {
    pub fn parse(raw: &str) -> Self {
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
        Self {
            path: path.to_string(),
            query: form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    /// Non-empty path segments, so `/api/items/` and `/api/items` route alike.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// First value of `key`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn parse_path_id(raw: &str, field: &'static str, message: &str) -> Result<i64, InventoryError> {
    raw.parse::<i64>()
        .map_err(|_| InventoryError::validation(field, message))
}

pub fn parse_rfid(raw: &str) -> Result<i64, InventoryError> {
    parse_path_id(raw, "rfid", INVALID_RFID)
}

pub fn parse_item_id(raw: &str) -> Result<i64, InventoryError> {
    parse_path_id(raw, "id", INVALID_ITEM_ID)
}

/// Leading integer of `raw`, the way a lenient `parseInt` reads `"5abc"`.
fn leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let end = raw
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(raw.len(), |(i, _)| i);
    raw[..end].parse().ok()
}

/// Build the listing query from `GET /api/items` parameters.
///
/// Unparseable page or limit values fall back to their defaults; `perishable` is true
/// only for the literal `true`; `expired` is ignored unless `true` or `false`.
pub fn item_query(target: &Target) -> ItemQuery {
    let mut query = ItemQuery::default()
        .page(target.param("page").and_then(leading_int).unwrap_or(1))
        .limit(
            target
                .param("limit")
                .and_then(leading_int)
                .unwrap_or(DEFAULT_LIMIT as i64),
        )
        .sort(
            target
                .param("sort_by")
                .map(SortField::parse)
                .unwrap_or_default(),
            target
                .param("sort_order")
                .map(SortOrder::parse)
                .unwrap_or_default(),
        );

    query.category = target
        .param("category")
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    query.perishable = target.param("perishable").map(|p| p == "true");
    query.expired = match target.param("expired") {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    };
    query
}
