//! Error taxonomy for the tag and item lifecycle.
//!
//! Every failure the registry or ledger can report is an `InventoryError`. The HTTP layer
//! maps `kind()` to a status code and `field()` to the key of the structured error body.

use crate::executor::DbError;
use std::fmt;

/// Coarse classification used for status mapping and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Duplicate,
    Internal,
}

#[derive(Debug)]
pub enum InventoryError {
    /// A supplied field failed validation
    Validation {
        field: &'static str,
        message: String,
    },
    TagNotFound(i64),
    CameraNotFound(i64),
    ItemNotFound(i64),
    /// Tag registration with an rfid that already exists
    DuplicateTag(i64),
    /// Item registration with a tag that is bound to an in-stock item
    TagAlreadyInUse(i64),
    /// Tag deletion while the tag is bound to an in-stock item
    TagInUse(i64),
    /// Checkout of an item that already left the warehouse
    ItemAlreadyCheckedOut(i64),
    /// Unexpected storage failure
    Database(DbError),
}

impl InventoryError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        InventoryError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::Validation { .. } => ErrorKind::Validation,
            InventoryError::TagNotFound(_)
            | InventoryError::CameraNotFound(_)
            | InventoryError::ItemNotFound(_) => ErrorKind::NotFound,
            InventoryError::TagAlreadyInUse(_)
            | InventoryError::TagInUse(_)
            | InventoryError::ItemAlreadyCheckedOut(_) => ErrorKind::Conflict,
            InventoryError::DuplicateTag(_) => ErrorKind::Duplicate,
            InventoryError::Database(_) => ErrorKind::Internal,
        }
    }

    /// Name of the request field the error is about, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            InventoryError::Validation { field, .. } => Some(field),
            InventoryError::TagNotFound(_)
            | InventoryError::DuplicateTag(_)
            | InventoryError::TagAlreadyInUse(_)
            | InventoryError::TagInUse(_) => Some("rfid"),
            InventoryError::CameraNotFound(_) => Some("camera_id"),
            InventoryError::ItemNotFound(_) => Some("id"),
            InventoryError::ItemAlreadyCheckedOut(_) => Some("timestamp_out"),
            InventoryError::Database(_) => None,
        }
    }
}

impl fmt::Display for InventoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryError::Validation { field, message } => {
                write!(f, "Validation failed for {}: {}", field, message)
            }
            InventoryError::TagNotFound(rfid) => write!(f, "RFID tag {} not found", rfid),
            InventoryError::CameraNotFound(id) => write!(f, "Camera {} not found", id),
            InventoryError::ItemNotFound(id) => write!(f, "Item {} not found", id),
            InventoryError::DuplicateTag(rfid) => write!(f, "RFID tag {} already exists", rfid),
            InventoryError::TagAlreadyInUse(rfid) => {
                write!(f, "RFID tag {} is already in use", rfid)
            }
            InventoryError::TagInUse(rfid) => {
                write!(f, "RFID tag {} is bound to an item in stock", rfid)
            }
            InventoryError::ItemAlreadyCheckedOut(id) => {
                write!(f, "Item {} has already been checked out", id)
            }
            InventoryError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for InventoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InventoryError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbError> for InventoryError {
    fn from(err: DbError) -> Self {
        InventoryError::Database(err)
    }
}
