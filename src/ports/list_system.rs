//! Marketing list port.
//!
//! Each operation accepts the request shape to use. The subscriber tries
//! [`CallPath::Primary`] first and [`CallPath::Fallback`] when it fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::sync::{truncate_diagnostic, CallPath};

/// Port for the list system.
#[async_trait]
pub trait ListSystem: Send + Sync {
    /// False when credentials or the list id are missing.
    fn is_configured(&self) -> bool;

    /// Subscribes the contact to the configured list.
    async fn subscribe(
        &self,
        request: &ListRequest,
        path: CallPath,
    ) -> Result<ListResponse, ListError>;

    /// Unsubscribes the contact from the configured list.
    async fn unsubscribe(
        &self,
        request: &ListRequest,
        path: CallPath,
    ) -> Result<ListResponse, ListError>;
}

/// Contact to (un)subscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    pub email: String,

    /// E.164 phone, when valid.
    pub phone: Option<String>,
}

/// A successful list response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    pub status: u16,
    pub body: String,
}

impl ListResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: truncate_diagnostic(body),
        }
    }
}

/// A failed list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListError {
    pub message: String,
    pub status: Option<u16>,
    pub body: Option<String>,
}

impl ListError {
    /// Request never produced a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Non-success status.
    pub fn rejected(status: u16, body: &str) -> Self {
        Self {
            message: format!("list system responded with status {}", status),
            status: Some(status),
            body: Some(truncate_diagnostic(body)),
        }
    }
}

impl std::fmt::Display for ListError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ListError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_system_is_object_safe() {
        fn _accepts_dyn(_system: &dyn ListSystem) {}
    }

    #[test]
    fn rejected_error_describes_status() {
        let err = ListError::rejected(429, "slow down");
        assert_eq!(err.to_string(), "list system responded with status 429");
        assert_eq!(err.status, Some(429));
        assert_eq!(err.body.as_deref(), Some("slow down"));
    }

    #[test]
    fn response_body_is_truncated() {
        let response = ListResponse::new(202, &"a".repeat(600));
        assert_eq!(response.body.len(), 512);
    }
}
