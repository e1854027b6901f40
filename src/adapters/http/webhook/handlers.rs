//! HTTP handlers for the subscription webhook.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::application::handlers::subscription::{SyncSubscriptionCommand, SyncSubscriptionHandler};
use crate::domain::sync::{FailureKind, PipelineOutcome, SubscriptionEvent, SyncError, SyncOutcome};

use super::dto::{ErrorResponse, HealthResponse, NotApplicableResponse, SyncResponse};

/// Header carrying the shared secret when neither body nor query does.
pub const SECRET_HEADER: &str = "x-webhook-secret";

/// Response deadline used unless the router is given another one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(75);

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookAppState {
    pub handler: Arc<SyncSubscriptionHandler>,
    /// Shared secret; `None` disables the check.
    pub secret: Option<SecretString>,
    /// How long a caller waits for the sync before getting a 504.
    pub request_timeout: Duration,
}

impl WebhookAppState {
    pub fn new(handler: Arc<SyncSubscriptionHandler>, secret: Option<SecretString>) -> Self {
        Self {
            handler,
            secret: secret.filter(|s| !s.expose_secret().is_empty()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Request decoding
// ════════════════════════════════════════════════════════════════════════════════

/// Decodes the raw body into an event.
///
/// An empty body is `{}`. A JSON string whose content is JSON is parsed
/// again. Anything that does not end up as an object is malformed.
pub fn decode_body(body: &[u8]) -> Result<SubscriptionEvent, SyncError> {
    let text = std::str::from_utf8(body).map_err(|_| SyncError::MalformedInput)?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(SubscriptionEvent::default());
    }

    let value: Value = serde_json::from_str(text).map_err(|_| SyncError::MalformedInput)?;
    let value = match value {
        Value::String(inner) => {
            serde_json::from_str(inner.trim()).map_err(|_| SyncError::MalformedInput)?
        }
        other => other,
    };

    SubscriptionEvent::from_value(value).ok_or(SyncError::MalformedInput)
}

/// Secret supplied by the caller: body `api_token`, then query `secret`,
/// then the `x-webhook-secret` header.
pub fn extract_secret(
    event: &SubscriptionEvent,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
) -> Option<String> {
    event
        .text(&["api_token"])
        .or_else(|| query.get("secret").filter(|s| !s.is_empty()).cloned())
        .or_else(|| {
            headers
                .get(SECRET_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
}

/// Constant-time comparison against the configured secret.
pub fn verify_secret(expected: Option<&SecretString>, provided: Option<&str>) -> Result<(), SyncError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = provided.unwrap_or_default();
    let matches: bool = provided
        .as_bytes()
        .ct_eq(expected.expose_secret().as_bytes())
        .into();
    if matches {
        Ok(())
    } else {
        Err(SyncError::Unauthorized)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { ok: true })
}

/// POST /api/webhooks/subscription - Process a subscription event
pub async fn handle_subscription_webhook(
    State(state): State<WebhookAppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookApiError> {
    let event = decode_body(&body).map_err(|err| {
        tracing::warn!(bytes = body.len(), "Rejected unparseable webhook body");
        err
    })?;

    let provided = extract_secret(&event, &query, &headers);
    verify_secret(state.secret.as_ref(), provided.as_deref()).map_err(|err| {
        tracing::warn!("Rejected webhook with invalid token");
        err
    })?;

    // The sync runs detached so a missed deadline never cancels either branch.
    let handler = state.handler.clone();
    let mut task =
        tokio::spawn(async move { handler.handle(SyncSubscriptionCommand { event }).await });

    let outcome = match tokio::time::timeout(state.request_timeout, &mut task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) if err.is_panic() => return Ok(panic_response(err.into_panic())),
        Ok(Err(err)) => return Err(SyncError::Internal(err.to_string()).into()),
        Err(_) => {
            let millis = u64::try_from(state.request_timeout.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(timeout_ms = millis, "Sync still running after response deadline");
            return Err(SyncError::Timeout(millis).into());
        }
    };

    Ok(match outcome {
        SyncOutcome::NotApplicable { webhook_type } => (
            StatusCode::ACCEPTED,
            Json(NotApplicableResponse::new(webhook_type)),
        )
            .into_response(),
        SyncOutcome::Completed(report) => {
            let status = status_for(&report.pipeline);
            (status, Json(SyncResponse::from(report))).into_response()
        }
    })
}

/// HTTP status of a completed sync, driven by the pipeline branch only.
fn status_for(pipeline: &PipelineOutcome) -> StatusCode {
    match pipeline {
        PipelineOutcome::Failed { kind, .. } => match kind {
            FailureKind::Downstream | FailureKind::ContactCreateFailed => StatusCode::BAD_GATEWAY,
            FailureKind::Configuration | FailureKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        _ => StatusCode::OK,
    }
}

/// Converts a caught panic into the generic JSON 500 body.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(detail = %detail, "Request handler panicked");

    let error = SyncError::Internal(detail);
    (error.status_code(), Json(ErrorResponse::new(error.to_string()))).into_response()
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts sync errors to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(SyncError);

impl From<SyncError> for WebhookApiError {
    fn from(err: SyncError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}
