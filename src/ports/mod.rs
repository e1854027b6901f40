//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Downstream Ports
//!
//! - `PipelineSystem` - Sales pipeline: contacts and sale records
//! - `ListSystem` - Marketing list membership

mod list_system;
mod pipeline_system;

pub use list_system::{ListError, ListRequest, ListResponse, ListSystem};
pub use pipeline_system::{NewPerson, PipelineError, PipelineErrorCode, PipelineSystem};
