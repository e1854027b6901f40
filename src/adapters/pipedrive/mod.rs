//! Pipedrive pipeline system adapter.
//!
//! Implements the `PipelineSystem` port for Pipedrive:
//! - Exact-match person and deal search (v2 search endpoints)
//! - Person and deal creation (v1 endpoints)
//!
//! The API token travels as the `api_token` query parameter and is held in a
//! `secrecy::SecretString`.

mod pipedrive_adapter;
mod types;

pub use pipedrive_adapter::{PipedriveAdapter, PipedriveConfig};
pub use types::{ContactPoint, PersonBody};
