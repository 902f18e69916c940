//! Tag Registry: the set of known RFID tags and their `used` flag.
//!
//! The flag only changes through `claim` and `release`, which the item ledger calls
//! inside its own transaction.

use crate::error::InventoryError;
use crate::metrics::record_event;
use crate::model::Tag;
use crate::store::{with_transaction, InventoryStore, InventoryTx};
use crate::validation::validate_rfid;
use std::sync::Arc;

pub struct TagRegistry<S> {
    store: Arc<S>,
}

impl<S> Clone for TagRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: InventoryStore> TagRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Register a new, unused tag.
    ///
    /// # Errors
    ///
    /// `Validation` for a non-positive rfid, `DuplicateTag` if it is already registered.
    pub fn register(&self, rfid: i64) -> Result<Tag, InventoryError> {
        validate_rfid(rfid)?;
        let tag = with_transaction(&*self.store, |tx| {
            if tx.find_tag(rfid, false)?.is_some() {
                return Err(InventoryError::DuplicateTag(rfid));
            }
            tx.insert_tag(rfid)
        })?;

        log::info!("Registered RFID tag {}", rfid);
        record_event("tag_registered");
        Ok(tag)
    }

    /// Remove an unused tag.
    ///
    /// Items that were bound to the tag earlier (all checked out) lose their reference.
    ///
    /// # Errors
    ///
    /// `TagNotFound` if absent, `TagInUse` while an in-stock item holds it.
    pub fn delete(&self, rfid: i64) -> Result<(), InventoryError> {
        with_transaction(&*self.store, |tx| {
            let tag = tx
                .find_tag(rfid, true)?
                .ok_or(InventoryError::TagNotFound(rfid))?;
            if tag.used {
                return Err(InventoryError::TagInUse(rfid));
            }
            tx.delete_tag(rfid)?;
            Ok(())
        })?;

        log::info!("Deleted RFID tag {}", rfid);
        record_event("tag_deleted");
        Ok(())
    }

    /// All tags, ascending by rfid.
    pub fn list(&self) -> Result<Vec<Tag>, InventoryError> {
        with_transaction(&*self.store, |tx| tx.list_tags())
    }
}

/// Mark `rfid` as bound to an in-stock item.
///
/// Locks the tag row first, so of two transactions claiming the same tag the second
/// sees `used = true` and fails.
pub(crate) fn claim<T: InventoryTx + ?Sized>(tx: &mut T, rfid: i64) -> Result<(), InventoryError> {
    let tag = tx
        .find_tag(rfid, true)?
        .ok_or(InventoryError::TagNotFound(rfid))?;
    if tag.used {
        return Err(InventoryError::TagAlreadyInUse(rfid));
    }
    tx.set_tag_used(rfid, true)?;
    record_event("tag_claimed");
    Ok(())
}

/// Mark `rfid` as free. Releasing an unused or deleted tag is not an error.
pub(crate) fn release<T: InventoryTx + ?Sized>(
    tx: &mut T,
    rfid: i64,
) -> Result<(), InventoryError> {
    if tx.set_tag_used(rfid, false)? {
        record_event("tag_released");
    } else {
        log::warn!("Released RFID tag {} which is not registered", rfid);
    }
    Ok(())
}
