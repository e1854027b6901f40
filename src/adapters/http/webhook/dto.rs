//! HTTP DTOs for the subscription webhook.
//!
//! Every body carries `ok`. Successful and skipped syncs also repeat the
//! pipeline result as flat fields for callers that only read those.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::sync::{DealId, ListOutcome, PersonId, PipelineOutcome, SyncReport};

/// Reason reported for events that are not subscription events.
pub const NOT_APPLICABLE_REASON: &str = "not-applicable";

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Body for events with another `webhook_type`.
#[derive(Debug, Clone, Serialize)]
pub struct NotApplicableResponse {
    pub ok: bool,
    pub skipped: bool,
    pub reason: &'static str,
    pub webhook_type: String,
}

impl NotApplicableResponse {
    pub fn new(webhook_type: String) -> Self {
        Self {
            ok: true,
            skipped: true,
            reason: NOT_APPLICABLE_REASON,
            webhook_type,
        }
    }
}

/// Body for a completed synchronization.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub ok: bool,
    pub invocation_id: Uuid,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<PersonId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<DealId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_close_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub pipeline: PipelineOutcome,
    pub list: ListOutcome,
}

impl From<SyncReport> for SyncResponse {
    fn from(report: SyncReport) -> Self {
        let mut response = Self {
            ok: report.is_ok(),
            invocation_id: report.invocation_id,
            skipped: false,
            reason: None,
            person_id: None,
            deal_id: report.pipeline.deal_id(),
            status: None,
            mrr: None,
            expected_close_date: None,
            error: None,
            status_code: None,
            pipeline: report.pipeline.clone(),
            list: report.list,
        };

        match report.pipeline {
            PipelineOutcome::Created {
                person_id,
                status,
                mrr,
                expected_close_date,
                ..
            } => {
                response.person_id = Some(person_id);
                response.status = Some(status);
                response.mrr = Some(mrr);
                response.expected_close_date = Some(expected_close_date);
            }
            PipelineOutcome::Skipped { reason, .. } => {
                response.skipped = true;
                response.reason = Some(reason.as_str());
            }
            PipelineOutcome::Failed {
                error, status_code, ..
            } => {
                response.error = Some(error);
                response.status_code = status_code;
            }
        }
        response
    }
}

/// Body for requests rejected before processing.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}
