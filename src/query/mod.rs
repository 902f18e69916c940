//! SQL generation with SeaQuery.
//!
//! Item listings take optional filters, so their statements are built with
//! `sea_query` and bound through `with_converted_params`; the fixed statements in the
//! store are plain SQL.

pub mod item_listing;
pub(crate) mod value_conversion;

pub use value_conversion::with_converted_params;
