//! Error types for subscription synchronization.
//!
//! Policy skips are not errors; they are reported as
//! [`PipelineOutcome::Skipped`](super::outcome::PipelineOutcome::Skipped).

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that abort an invocation or one of its branches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Body is not a JSON object.
    #[error("Invalid JSON body")]
    MalformedInput,

    /// Shared secret missing or mismatched.
    #[error("invalid token")]
    Unauthorized,

    /// A required setting is absent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A downstream call failed or returned an unsuccessful response.
    #[error("{message}")]
    Downstream {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// Person creation failed or returned no id.
    #[error("Failed to create person: {message}")]
    ContactCreateFailed {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// The response deadline passed; processing continues in the background.
    #[error("Request timed out after {0} ms; processing continues")]
    Timeout(u64),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SyncError::Configuration(message.into())
    }

    pub fn downstream(message: impl Into<String>) -> Self {
        SyncError::Downstream {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    pub fn contact_create_failed(message: impl Into<String>) -> Self {
        SyncError::ContactCreateFailed {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Downstream HTTP status, when the failure came from a response.
    pub fn downstream_status(&self) -> Option<u16> {
        match self {
            SyncError::Downstream { status, .. } | SyncError::ContactCreateFailed { status, .. } => {
                *status
            }
            _ => None,
        }
    }

    /// Downstream response body, when one was captured.
    pub fn downstream_body(&self) -> Option<&str> {
        match self {
            SyncError::Downstream { body, .. } | SyncError::ContactCreateFailed { body, .. } => {
                body.as_deref()
            }
            _ => None,
        }
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::MalformedInput => StatusCode::BAD_REQUEST,
            SyncError::Unauthorized => StatusCode::UNAUTHORIZED,
            SyncError::Downstream { .. } | SyncError::ContactCreateFailed { .. } => {
                StatusCode::BAD_GATEWAY
            }
            SyncError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SyncError::Configuration(_) | SyncError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Display
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn client_errors_display_response_messages() {
        assert_eq!(SyncError::MalformedInput.to_string(), "Invalid JSON body");
        assert_eq!(SyncError::Unauthorized.to_string(), "invalid token");
    }

    #[test]
    fn contact_failure_displays_cause() {
        let err = SyncError::contact_create_failed("no id returned");
        assert_eq!(err.to_string(), "Failed to create person: no id returned");
    }

    // ══════════════════════════════════════════════════════════════
    // Status codes
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(SyncError::MalformedInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(SyncError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            SyncError::configuration("missing field key").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(SyncError::downstream("boom").status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            SyncError::contact_create_failed("boom").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            SyncError::Internal("panic".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(SyncError::Timeout(100).status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn downstream_details_are_exposed() {
        let err = SyncError::Downstream {
            message: "deal create failed".to_string(),
            status: Some(422),
            body: Some("{\"success\":false}".to_string()),
        };
        assert_eq!(err.downstream_status(), Some(422));
        assert_eq!(err.downstream_body(), Some("{\"success\":false}"));
        assert_eq!(SyncError::Unauthorized.downstream_status(), None);
    }
}
