//! Route table and handlers.
//!
//! `InventoryApi::handle` is independent of the HTTP server, so the whole API can be
//! exercised in tests without opening a socket.

use super::payload;
use super::request::{item_query, parse_item_id, parse_rfid, Target};
use super::response::{error_response, ApiResponse};
use crate::error::InventoryError;
use crate::ledger::{Clock, ItemLedger};
use crate::registry::TagRegistry;
use crate::store::InventoryStore;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

pub struct InventoryApi<S> {
    tags: TagRegistry<S>,
    ledger: ItemLedger<S>,
    store: Arc<S>,
    environment: String,
}

impl<S: InventoryStore> InventoryApi<S> {
    pub fn new(store: Arc<S>, environment: impl Into<String>) -> Self {
        Self::with_clock(store, environment, Arc::new(Utc::now))
    }

    pub fn with_clock(store: Arc<S>, environment: impl Into<String>, clock: Clock) -> Self {
        Self {
            tags: TagRegistry::new(Arc::clone(&store)),
            ledger: ItemLedger::with_clock(Arc::clone(&store), clock),
            store,
            environment: environment.into(),
        }
    }

    pub fn tags(&self) -> &TagRegistry<S> {
        &self.tags
    }

    pub fn ledger(&self) -> &ItemLedger<S> {
        &self.ledger
    }

    /// Dispatch one request. `target` is the raw request target including the query.
    pub fn handle(&self, method: &str, target: &str, body: &[u8]) -> ApiResponse {
        let target = Target::parse(target);
        let segments = target.segments();

        match (method, segments.as_slice()) {
            ("GET", []) => self.health(),
            ("GET", ["db-test"]) => self.db_test(),
            #[cfg(feature = "metrics")]
            ("GET", ["metrics"]) => ApiResponse::text(
                200,
                super::response::PROMETHEUS_TEXT,
                crate::metrics::METRICS.render(),
            ),

            ("POST", ["api", "rfid", "register"]) => self.register_tag(body),
            ("GET", ["api", "rfid"]) => self.list_tags(),
            ("DELETE", ["api", "rfid", rfid]) => self.delete_tag(rfid),

            ("POST", ["api", "items"]) => self.register_item(body),
            ("GET", ["api", "items"]) => self.list_items(&target),
            ("GET", ["api", "items", "expired"]) => self.expired_items(),
            ("GET", ["api", "items", id]) => self.get_item(id),
            ("PUT", ["api", "items", id]) => self.update_item(id, body),
            ("PUT", ["api", "items", id, "checkout"]) => self.checkout_item(id),
            ("DELETE", ["api", "items", id]) => self.delete_item(id),

            _ => ApiResponse::not_found(&target.path),
        }
    }

    fn health(&self) -> ApiResponse {
        ApiResponse::json(
            200,
            &json!({
                "status": "healthy",
                "message": "Stockguard API is running",
                "environment": self.environment,
                "timestamp": Utc::now(),
            }),
        )
    }

    fn db_test(&self) -> ApiResponse {
        match self.store.ping() {
            Ok(time) => ApiResponse::json(
                200,
                &json!({
                    "status": "success",
                    "message": "Database connection successful",
                    "time": time,
                    "environment": self.environment,
                }),
            ),
            Err(e) => {
                log::error!("Database connectivity check failed: {}", e);
                ApiResponse::json(
                    500,
                    &json!({
                        "status": "error",
                        "message": "Database connection failed",
                        "environment": self.environment,
                    }),
                )
            }
        }
    }

    fn register_tag(&self, body: &[u8]) -> ApiResponse {
        const FAILURE: &str = "Failed to register RFID tag";
        match payload::tag_registration(body).and_then(|rfid| self.tags.register(rfid)) {
            Ok(tag) => ApiResponse::json(
                201,
                &json!({ "message": "RFID tag registered successfully", "rfid": tag }),
            ),
            Err(e) => error_response(&e, FAILURE),
        }
    }

    fn list_tags(&self) -> ApiResponse {
        match self.tags.list() {
            Ok(tags) => ApiResponse::json(200, &json!({ "count": tags.len(), "rfidTags": tags })),
            Err(e) => error_response(&e, "Error fetching RFID tags"),
        }
    }

    fn delete_tag(&self, raw: &str) -> ApiResponse {
        let result = parse_rfid(raw).and_then(|rfid| self.tags.delete(rfid).map(|()| rfid));
        match result {
            Ok(rfid) => ApiResponse::json(
                200,
                &json!({ "message": "RFID tag deleted successfully", "rfid": rfid }),
            ),
            Err(e) => error_response(&e, "Error deleting RFID tag"),
        }
    }

    fn register_item(&self, body: &[u8]) -> ApiResponse {
        match payload::new_item(body).and_then(|item| self.ledger.register(item)) {
            Ok(item) => ApiResponse::json(
                201,
                &json!({ "message": "Item registered successfully", "item": item }),
            ),
            Err(e) => error_response(&e, "Failed to register item"),
        }
    }

    fn list_items(&self, target: &Target) -> ApiResponse {
        let query = item_query(target);
        match self.ledger.list(&query) {
            Ok(page) => ApiResponse::json(
                200,
                &json!({
                    "items": page.items,
                    "pagination": {
                        "total": page.total,
                        "page": page.page,
                        "limit": page.limit,
                        "totalPages": page.total_pages,
                    },
                }),
            ),
            Err(e) => error_response(&e, "Error fetching items"),
        }
    }

    fn expired_items(&self) -> ApiResponse {
        match self.ledger.list_expired() {
            Ok(items) => ApiResponse::json(200, &json!({ "count": items.len(), "items": items })),
            Err(e) => error_response(&e, "Error fetching expired items"),
        }
    }

    fn get_item(&self, raw: &str) -> ApiResponse {
        match parse_item_id(raw).and_then(|id| self.ledger.get(id)) {
            Ok(item) => ApiResponse::json(200, &item),
            Err(e) => error_response(&e, "Error fetching item"),
        }
    }

    fn update_item(&self, raw: &str, body: &[u8]) -> ApiResponse {
        let result: Result<_, InventoryError> = parse_item_id(raw).and_then(|id| {
            let patch = payload::item_patch(body)?;
            self.ledger.update(id, patch)
        });
        match result {
            Ok(outcome) => {
                let message = if outcome.changed {
                    "Item updated successfully"
                } else {
                    "No changes to update"
                };
                ApiResponse::json(200, &json!({ "message": message, "item": outcome.item }))
            }
            Err(e) => error_response(&e, "Failed to update item"),
        }
    }

    fn checkout_item(&self, raw: &str) -> ApiResponse {
        match parse_item_id(raw).and_then(|id| self.ledger.checkout(id)) {
            Ok(item) => ApiResponse::json(
                200,
                &json!({ "message": "Item checked out successfully", "item": item }),
            ),
            Err(e) => error_response(&e, "Failed to check out item"),
        }
    }

    fn delete_item(&self, raw: &str) -> ApiResponse {
        match parse_item_id(raw).and_then(|id| self.ledger.delete(id)) {
            Ok(item) => ApiResponse::json(
                200,
                &json!({ "message": "Item deleted successfully", "id": item.id }),
            ),
            Err(e) => error_response(&e, "Error deleting item"),
        }
    }
}
