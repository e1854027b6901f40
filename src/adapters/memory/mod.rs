//! In-memory downstream systems for tests and dry runs.
//!
//! Both fakes record every call and support failure injection so the
//! orchestrator's branch containment can be exercised without a network.

mod list_system;
mod pipeline_system;

pub use list_system::{InMemoryListSystem, RecordedListCall};
pub use pipeline_system::{InMemoryPipelineSystem, PipelineOperation, StoredDeal, StoredPerson};
