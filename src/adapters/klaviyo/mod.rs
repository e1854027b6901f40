//! Klaviyo list system adapter.
//!
//! Implements the `ListSystem` port with Klaviyo's bulk subscription jobs:
//! - `POST /api/profile-subscription-bulk-create-jobs/` to subscribe
//! - `POST /api/profile-subscription-bulk-delete-jobs/` to unsubscribe
//!
//! Each operation has a primary and a fallback request body.

pub mod bodies;
mod klaviyo_adapter;

pub use klaviyo_adapter::{KlaviyoAdapter, KlaviyoConfig, DEFAULT_BASE_URL, DEFAULT_REVISION};
