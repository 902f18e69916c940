//! Response bodies and the mapping from lifecycle errors to HTTP statuses.

use crate::error::{ErrorKind, InventoryError};
use serde::Serialize;
use serde_json::{json, Value};

pub const JSON: &str = "application/json";
pub const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// A fully rendered response, independent of the HTTP server.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(body) => Self {
                status,
                content_type: JSON,
                body,
            },
            Err(e) => {
                log::error!("Failed to serialise response body: {}", e);
                Self::internal("Internal server error")
            }
        }
    }

    pub fn text(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    fn internal(message: &str) -> Self {
        Self {
            status: 500,
            content_type: JSON,
            body: format!(r#"{{"message":"{}"}}"#, message).into_bytes(),
        }
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::json(
            413,
            &json!({ "message": format!("Request body exceeds {} bytes", limit) }),
        )
    }

    pub fn not_found(path: &str) -> Self {
        Self::json(
            404,
            &json!({
                "status": "error",
                "message": "Endpoint not found",
                "path": path,
                "timestamp": chrono::Utc::now(),
            }),
        )
    }

    /// Parse the body back into JSON.
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Reason phrase for the status line.
pub fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

pub fn status_for(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::Validation | ErrorKind::Conflict | ErrorKind::Duplicate => 400,
        ErrorKind::NotFound => 404,
        ErrorKind::Internal => 500,
    }
}

/// Headline and per-field text for an error.
///
/// Validation and internal failures use the operation's `failure` message. Internal
/// details only go to the log.
fn describe(err: &InventoryError, failure: &'static str) -> (String, Option<String>) {
    match err {
        InventoryError::Validation { message, .. } => (failure.to_string(), Some(message.clone())),
        InventoryError::TagNotFound(_) => (
            "RFID tag not found".to_string(),
            Some("RFID tag not found in the system".to_string()),
        ),
        InventoryError::TagAlreadyInUse(_) => (
            "RFID tag is already in use".to_string(),
            Some("This RFID tag is already associated with another item".to_string()),
        ),
        InventoryError::CameraNotFound(_) => (
            "Camera ID not found".to_string(),
            Some("Camera ID does not exist in the system".to_string()),
        ),
        InventoryError::DuplicateTag(_) => (
            "RFID tag already exists".to_string(),
            Some("This RFID tag is already registered in the system".to_string()),
        ),
        InventoryError::TagInUse(_) => (
            "Cannot delete RFID tag that is currently in use".to_string(),
            Some("RFID tag is currently associated with an item".to_string()),
        ),
        InventoryError::ItemNotFound(_) => ("Item not found".to_string(), None),
        InventoryError::ItemAlreadyCheckedOut(_) => (
            "Item has already been checked out".to_string(),
            Some("This item has already left the warehouse".to_string()),
        ),
        InventoryError::Database(_) => (failure.to_string(), None),
    }
}

/// Render `err` as `{message, errors: {field: text}}` with the matching status.
pub fn error_response(err: &InventoryError, failure: &'static str) -> ApiResponse {
    let status = status_for(err.kind());
    if status >= 500 {
        log::error!("{}: {}", failure, err);
    } else {
        log::debug!("{}: {}", failure, err);
    }

    let (message, detail) = describe(err, failure);
    let body = match (err.field(), detail) {
        (Some(field), Some(detail)) => json!({ "message": message, "errors": { field: detail } }),
        _ => json!({ "message": message }),
    };
    ApiResponse::json(status, &body)
}
