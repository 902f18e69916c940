//! Domain records for tags and items.

mod item;
mod query;
mod tag;

pub use item::{Item, ItemChanges, ItemPatch, NewItem, UpdateOutcome};
pub use query::{ItemPage, ItemQuery, SortField, SortOrder, DEFAULT_LIMIT, MAX_LIMIT, MAX_PAGE};
pub use tag::Tag;
