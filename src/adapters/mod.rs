//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Inbound webhook endpoint (axum)
//! - `pipedrive` - `PipelineSystem` over the Pipedrive REST API
//! - `klaviyo` - `ListSystem` over the Klaviyo bulk subscription jobs
//! - `memory` - In-memory fakes of both downstream ports

pub mod http;
pub mod klaviyo;
pub mod memory;
pub mod pipedrive;

pub use klaviyo::{KlaviyoAdapter, KlaviyoConfig};
pub use memory::{InMemoryListSystem, InMemoryPipelineSystem};
pub use pipedrive::{PipedriveAdapter, PipedriveConfig};
