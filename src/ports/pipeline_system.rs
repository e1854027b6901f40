//! Pipeline system port.
//!
//! Outbound boundary to the CRM that holds persons and sale records
//! ("deals"). The contract deliberately has no update operations: a person
//! or deal this service sees is either found or created, never modified.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::sync::{truncate_diagnostic, DealId, PersonId, SaleRecordPayload, SyncError};

/// Port for the pipeline system.
#[async_trait]
pub trait PipelineSystem: Send + Sync {
    /// Exact-match person search by email.
    async fn find_person_by_email(&self, email: &str) -> Result<Option<PersonId>, PipelineError>;

    /// Creates a person. `Ok(None)` means the call succeeded without an id.
    async fn create_person(&self, person: &NewPerson) -> Result<Option<PersonId>, PipelineError>;

    /// Exact-match deal search on a custom field.
    async fn find_deal_by_field(
        &self,
        field_key: &str,
        value: &str,
    ) -> Result<Option<DealId>, PipelineError>;

    /// Creates a deal. `Ok(None)` means the call succeeded without an id.
    async fn create_deal(&self, deal: &SaleRecordPayload) -> Result<Option<DealId>, PipelineError>;
}

/// Request to create a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_to: Option<i64>,
}

/// Errors from pipeline system calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineError {
    /// Error code for categorization.
    pub code: PipelineErrorCode,

    /// Human-readable message.
    pub message: String,

    /// HTTP status of the downstream response, if one was received.
    pub status: Option<u16>,

    /// Truncated downstream response body.
    pub body: Option<String>,
}

impl PipelineError {
    pub fn new(code: PipelineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            body: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(truncate_diagnostic(body));
        self
    }

    /// Request never produced a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PipelineErrorCode::NetworkError, message)
    }

    /// Non-2xx response or `success: false`.
    pub fn rejected(status: u16, body: &str) -> Self {
        Self::new(
            PipelineErrorCode::Rejected,
            format!("pipeline system responded with status {}", status),
        )
        .with_status(status)
        .with_body(body)
    }

    /// Response body could not be understood.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PipelineErrorCode::InvalidResponse, message)
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PipelineError {}

impl From<PipelineError> for SyncError {
    fn from(err: PipelineError) -> Self {
        SyncError::Downstream {
            message: err.to_string(),
            status: err.status,
            body: err.body,
        }
    }
}

/// Pipeline error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineErrorCode {
    /// Transport failure or timeout.
    NetworkError,

    /// Downstream refused the request.
    Rejected,

    /// Downstream answered with something unparseable.
    InvalidResponse,
}

impl std::fmt::Display for PipelineErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineErrorCode::NetworkError => "network_error",
            PipelineErrorCode::Rejected => "rejected",
            PipelineErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}
