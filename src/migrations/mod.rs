//! The inventory schema, in application order.

mod m20240301090000_create_camera;
mod m20240301090100_create_rfid_tags;
mod m20240301090200_create_items;

use crate::migration::Migration;

pub use m20240301090000_create_camera::CreateCamera;
pub use m20240301090100_create_rfid_tags::CreateRfidTags;
pub use m20240301090200_create_items::CreateItems;

pub fn all() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(CreateCamera),
        Box::new(CreateRfidTags),
        Box::new(CreateItems),
    ]
}
