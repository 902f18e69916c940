//! REST API over `may_minihttp`.
//!
//! Routes map one-to-one onto `TagRegistry` and `ItemLedger` operations. Errors are
//! rendered as `{message, errors: {field: text}}`; validation, conflict and duplicate
//! failures are 400, lookups that miss are 404.

mod payload;
mod request;
mod response;
mod router;
mod server;

pub use response::{error_response, status_for, ApiResponse};
pub use router::InventoryApi;
pub use server::{serve, InventoryService};
