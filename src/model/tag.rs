use serde::Serialize;

/// An RFID tag known to the warehouse.
///
/// `used` is true exactly while one in-stock item is bound to the tag. Only the item
/// ledger flips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub rfid: i64,
    pub used: bool,
}

impl Tag {
    pub fn new(rfid: i64) -> Self {
        Self { rfid, used: false }
    }
}
