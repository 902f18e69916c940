//! REST API behaviour through `InventoryApi::handle`, backed by the in-memory store.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use stockguard::http::InventoryApi;
use stockguard::MemoryStore;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn api() -> InventoryApi<MemoryStore> {
    let store = Arc::new(MemoryStore::with_cameras([101, 102]));
    InventoryApi::with_clock(store, "test", Arc::new(fixed_now))
}

fn call(api: &InventoryApi<MemoryStore>, method: &str, target: &str, body: Value) -> (u16, Value) {
    let body = if body.is_null() {
        Vec::new()
    } else {
        serde_json::to_vec(&body).unwrap()
    };
    let rsp = api.handle(method, target, &body);
    (rsp.status, rsp.json_body().unwrap_or(Value::Null))
}

fn register_tag(api: &InventoryApi<MemoryStore>, rfid: i64) {
    let (status, _) = call(api, "POST", "/api/rfid/register", json!({ "rfid": rfid }));
    assert_eq!(status, 201);
}

fn register_item(api: &InventoryApi<MemoryStore>, body: Value) -> (u16, Value) {
    call(api, "POST", "/api/items", body)
}

fn perishable(rfid: i64, expiry: &str) -> Value {
    json!({
        "category": "Food",
        "perishable": true,
        "weight": 5.5,
        "dry": false,
        "fragile": false,
        "threshold": 2,
        "expiry_date": expiry,
        "camera_id": 101,
        "rfid": rfid,
    })
}

#[test]
fn test_health_reports_environment() {
    let api = api();
    let (status, body) = call(&api, "GET", "/", Value::Null);
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "test");

    let (status, body) = call(&api, "GET", "/db-test", Value::Null);
    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
}

#[test]
fn test_tag_registration_and_listing() {
    let api = api();
    let (status, body) = call(&api, "POST", "/api/rfid/register", json!({ "rfid": 1001 }));
    assert_eq!(status, 201);
    assert_eq!(body["rfid"], json!({ "rfid": 1001, "used": false }));

    let (status, body) = call(&api, "POST", "/api/rfid/register", json!({ "rfid": 1001 }));
    assert_eq!(status, 400);
    assert_eq!(body["message"], "RFID tag already exists");
    assert!(body["errors"]["rfid"].is_string());

    let (status, body) = call(&api, "POST", "/api/rfid/register", json!({ "rfid": -5 }));
    assert_eq!(status, 400);
    assert_eq!(body["errors"]["rfid"], "Invalid RFID value");

    let (status, body) = call(&api, "GET", "/api/rfid", Value::Null);
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
    assert_eq!(body["rfidTags"][0]["rfid"], 1001);
}

#[test]
fn test_register_item_binds_tag() {
    let api = api();
    register_tag(&api, 1001);

    let (status, body) = register_item(&api, perishable(1001, "2024-12-31"));
    assert_eq!(status, 201);
    assert_eq!(body["message"], "Item registered successfully");
    let item = &body["item"];
    assert_eq!(item["id"], 1);
    assert_eq!(item["rfid"], 1001);
    assert_eq!(item["expiry_date"], "2024-12-31");
    assert!(item["timestamp_out"].is_null());
    let timestamp_in: DateTime<Utc> = item["timestamp_in"].as_str().unwrap().parse().unwrap();
    assert_eq!(timestamp_in, fixed_now());

    let (_, tags) = call(&api, "GET", "/api/rfid", Value::Null);
    assert_eq!(tags["rfidTags"][0]["used"], true);

    // the tag cannot be bound a second time while the item is in stock
    let (status, body) = register_item(&api, perishable(1001, "2024-12-31"));
    assert_eq!(status, 400);
    assert_eq!(body["message"], "RFID tag is already in use");
}

#[test]
fn test_register_item_validation_errors() {
    let api = api();
    register_tag(&api, 1001);

    let mut body = perishable(1001, "2024-12-31");
    body.as_object_mut().unwrap().remove("expiry_date");
    let (status, rsp) = register_item(&api, body);
    assert_eq!(status, 400);
    assert_eq!(rsp["message"], "Failed to register item");
    assert_eq!(
        rsp["errors"]["expiry_date"],
        "Expiry date is required for perishable items"
    );

    let (status, rsp) = register_item(&api, perishable(9999, "2024-12-31"));
    assert_eq!(status, 404);
    assert_eq!(rsp["message"], "RFID tag not found");

    let mut body = perishable(1001, "2024-12-31");
    body["camera_id"] = json!(555);
    let (status, rsp) = register_item(&api, body);
    assert_eq!(status, 404);
    assert_eq!(rsp["errors"]["camera_id"], "Camera ID does not exist in the system");

    // failed registrations leave the tag free
    let (_, tags) = call(&api, "GET", "/api/rfid", Value::Null);
    assert_eq!(tags["rfidTags"][0]["used"], false);

    let rsp = api.handle("POST", "/api/items", b"not json");
    assert_eq!(rsp.status, 400);
}

#[test]
fn test_checkout_releases_tag_and_rejects_repeat() {
    let api = api();
    register_tag(&api, 1001);
    let (_, body) = register_item(&api, perishable(1001, "2024-12-31"));
    let id = body["item"]["id"].as_i64().unwrap();

    let (status, body) = call(&api, "PUT", &format!("/api/items/{id}/checkout"), Value::Null);
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Item checked out successfully");
    assert!(body["item"]["timestamp_out"].is_string());

    let (_, tags) = call(&api, "GET", "/api/rfid", Value::Null);
    assert_eq!(tags["rfidTags"][0]["used"], false);

    let (status, body) = call(&api, "PUT", &format!("/api/items/{id}/checkout"), Value::Null);
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Item has already been checked out");

    // the released tag can be reused for a new item
    let (status, _) = register_item(&api, perishable(1001, "2025-01-31"));
    assert_eq!(status, 201);
}

#[test]
fn test_update_item() {
    let api = api();
    register_tag(&api, 1001);
    register_item(&api, perishable(1001, "2024-12-31"));

    let (status, body) = call(
        &api,
        "PUT",
        "/api/items/1",
        json!({ "category": "Frozen", "weight": "7.25", "camera_id": 102 }),
    );
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Item updated successfully");
    assert_eq!(body["item"]["category"], "Frozen");
    assert_eq!(body["item"]["weight"], 7.25);
    assert_eq!(body["item"]["camera_id"], 102);

    let (status, body) = call(&api, "PUT", "/api/items/1", json!({}));
    assert_eq!(status, 200);
    assert_eq!(body["message"], "No changes to update");

    let (status, body) = call(&api, "PUT", "/api/items/1", json!({ "expiry_date": "" }));
    assert_eq!(status, 400);
    assert!(body["errors"]["expiry_date"].is_string());

    let (status, _) = call(&api, "PUT", "/api/items/42", json!({ "category": "Tools" }));
    assert_eq!(status, 404);

    let (status, body) = call(&api, "PUT", "/api/items/1", json!({ "timestamp_out": true }));
    assert_eq!(status, 200);
    assert!(body["item"]["timestamp_out"].is_string());
}

#[test]
fn test_list_items_filters_and_paginates() {
    let api = api();
    for rfid in 1001..=1003 {
        register_tag(&api, rfid);
    }
    register_item(&api, perishable(1001, "2024-01-15"));
    register_item(&api, perishable(1002, "2024-12-31"));
    register_item(
        &api,
        json!({
            "category": "Tools",
            "weight": 12,
            "threshold": 1,
            "camera_id": 102,
            "rfid": 1003,
        }),
    );

    let (status, body) = call(&api, "GET", "/api/items?limit=2", Value::Null);
    assert_eq!(status, 200);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["pagination"],
        json!({ "total": 3, "page": 1, "limit": 2, "totalPages": 2 })
    );

    let (_, body) = call(&api, "GET", "/api/items?expired=true", Value::Null);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["rfid"], 1001);

    let (_, body) = call(&api, "GET", "/api/items?expired=false", Value::Null);
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = call(&api, "GET", "/api/items?category=Tools", Value::Null);
    assert_eq!(body["pagination"]["total"], 1);

    let (_, body) = call(&api, "GET", "/api/items?sort_by=weight&sort_order=desc", Value::Null);
    assert_eq!(body["items"][0]["category"], "Tools");

    let (_, body) = call(&api, "GET", "/api/items/expired", Value::Null);
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["expiry_date"], "2024-01-15");
}

#[test]
fn test_checked_out_expired_item_leaves_both_expiry_listings() {
    let api = api();
    register_tag(&api, 1001);
    register_tag(&api, 1002);
    register_item(&api, perishable(1001, "2024-01-15"));
    let (_, body) = register_item(&api, perishable(1002, "2024-02-01"));
    let gone = body["item"]["id"].as_i64().unwrap();

    let (status, _) = call(&api, "PUT", &format!("/api/items/{gone}/checkout"), Value::Null);
    assert_eq!(status, 200);

    let (_, body) = call(&api, "GET", "/api/items?expired=true", Value::Null);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["items"][0]["rfid"], 1001);

    let (_, body) = call(&api, "GET", "/api/items/expired", Value::Null);
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["rfid"], 1001);

    // still past its date, so not "unexpired" either; the plain listing keeps it
    let (_, body) = call(&api, "GET", "/api/items?expired=false", Value::Null);
    assert_eq!(body["pagination"]["total"], 0);
    let (_, body) = call(&api, "GET", "/api/items", Value::Null);
    assert_eq!(body["pagination"]["total"], 2);
}

#[test]
fn test_huge_page_returns_empty_listing() {
    let api = api();
    register_tag(&api, 1001);
    register_item(&api, perishable(1001, "2024-12-31"));

    let (status, body) = call(&api, "GET", "/api/items?page=1000000000000000000", Value::Null);
    assert_eq!(status, 200);
    assert!(body["items"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 1);
}

#[test]
fn test_delete_item_and_tag() {
    let api = api();
    register_tag(&api, 1001);
    register_item(&api, perishable(1001, "2024-12-31"));

    let (status, body) = call(&api, "DELETE", "/api/rfid/1001", Value::Null);
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Cannot delete RFID tag that is currently in use");

    let (status, body) = call(&api, "DELETE", "/api/items/1", Value::Null);
    assert_eq!(status, 200);
    assert_eq!(body["id"], 1);

    let (status, _) = call(&api, "GET", "/api/items/1", Value::Null);
    assert_eq!(status, 404);

    let (status, body) = call(&api, "DELETE", "/api/rfid/1001", Value::Null);
    assert_eq!(status, 200);
    assert_eq!(body["rfid"], 1001);

    let (status, _) = call(&api, "DELETE", "/api/rfid/1001", Value::Null);
    assert_eq!(status, 404);
}

#[test]
fn test_malformed_ids_and_unknown_routes() {
    let api = api();
    let (status, body) = call(&api, "GET", "/api/items/abc", Value::Null);
    assert_eq!(status, 400);
    assert_eq!(body["errors"]["id"], "Invalid item ID");

    let (status, _) = call(&api, "DELETE", "/api/rfid/xyz", Value::Null);
    assert_eq!(status, 400);

    let (status, body) = call(&api, "GET", "/api/unknown", Value::Null);
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Endpoint not found");
    assert_eq!(body["path"], "/api/unknown");

    let (status, _) = call(&api, "PATCH", "/api/items/1", Value::Null);
    assert_eq!(status, 404);
}
