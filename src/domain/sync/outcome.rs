//! Branch outcomes and the merged result of one invocation.

use serde::Serialize;
use uuid::Uuid;

use super::errors::SyncError;
use super::ids::{DealId, PersonId};

/// Maximum characters of a downstream body kept for diagnostics.
pub const MAX_DIAGNOSTIC_CHARS: usize = 512;

/// Truncates a downstream body to [`MAX_DIAGNOSTIC_CHARS`] characters.
pub fn truncate_diagnostic(body: &str) -> String {
    body.chars().take(MAX_DIAGNOSTIC_CHARS).collect()
}

/// Why the pipeline branch did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    CancellationEvent,
    MissingSubscriptionCode,
    StatusNotAllowed,
    NotFirstCycle,
    AlreadyExists,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::CancellationEvent => "cancellation-event",
            SkipReason::MissingSubscriptionCode => "missing-subscription-code",
            SkipReason::StatusNotAllowed => "status-not-allowed",
            SkipReason::NotFirstCycle => "not-first-cycle",
            SkipReason::AlreadyExists => "already-exists",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the list branch should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListAction {
    Subscribe,
    Unsubscribe,
    None,
}

/// Which request shape produced a list outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPath {
    Primary,
    Fallback,
}

/// Why the list branch was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListSkipReason {
    NotConfigured,
    MissingEmail,
    NoAction,
}

/// One failed list call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListCallFailure {
    pub path: CallPath,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Result of the list branch. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ListOutcome {
    Skipped {
        action: ListAction,
        reason: ListSkipReason,
    },
    Succeeded {
        action: ListAction,
        path: CallPath,
        status_code: u16,
        body: String,
    },
    Failed {
        action: ListAction,
        primary: ListCallFailure,
        fallback: ListCallFailure,
    },
}

impl ListOutcome {
    pub fn skipped(action: ListAction, reason: ListSkipReason) -> Self {
        ListOutcome::Skipped { action, reason }
    }

    pub fn action(&self) -> ListAction {
        match self {
            ListOutcome::Skipped { action, .. }
            | ListOutcome::Succeeded { action, .. }
            | ListOutcome::Failed { action, .. } => *action,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ListOutcome::Succeeded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ListOutcome::Failed { .. })
    }

    /// Path of the successful call, if any.
    pub fn path(&self) -> Option<CallPath> {
        match self {
            ListOutcome::Succeeded { path, .. } => Some(*path),
            _ => None,
        }
    }
}

/// Category of a pipeline branch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Downstream,
    ContactCreateFailed,
    Internal,
}

/// Result of the pipeline branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Created {
        person_id: PersonId,
        deal_id: DealId,
        status: String,
        mrr: f64,
        expected_close_date: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stage_id: Option<i64>,
    },
    Skipped {
        reason: SkipReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        deal_id: Option<DealId>,
    },
    Failed {
        kind: FailureKind,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
}

impl PipelineOutcome {
    pub fn skipped(reason: SkipReason) -> Self {
        PipelineOutcome::Skipped {
            reason,
            deal_id: None,
        }
    }

    pub fn already_exists(deal_id: DealId) -> Self {
        PipelineOutcome::Skipped {
            reason: SkipReason::AlreadyExists,
            deal_id: Some(deal_id),
        }
    }

    /// Converts a branch error into a contained failure outcome.
    pub fn failed(err: &SyncError) -> Self {
        let kind = match err {
            SyncError::Configuration(_) => FailureKind::Configuration,
            SyncError::ContactCreateFailed { .. } => FailureKind::ContactCreateFailed,
            SyncError::Downstream { .. } => FailureKind::Downstream,
            _ => FailureKind::Internal,
        };
        PipelineOutcome::Failed {
            kind,
            error: err.to_string(),
            status_code: err.downstream_status(),
            body: err.downstream_body().map(truncate_diagnostic),
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, PipelineOutcome::Created { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PipelineOutcome::Failed { .. })
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            PipelineOutcome::Skipped { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn deal_id(&self) -> Option<DealId> {
        match self {
            PipelineOutcome::Created { deal_id, .. } => Some(*deal_id),
            PipelineOutcome::Skipped { deal_id, .. } => *deal_id,
            PipelineOutcome::Failed { .. } => None,
        }
    }
}

/// Merged result of both branches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub invocation_id: Uuid,
    pub subscription_code: String,
    pub pipeline: PipelineOutcome,
    pub list: ListOutcome,
}

impl SyncReport {
    /// A pipeline failure makes the whole invocation unsuccessful; list
    /// failures do not.
    pub fn is_ok(&self) -> bool {
        !self.pipeline.is_failure()
    }
}

/// Terminal state of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The event declared a type other than `subscription`.
    NotApplicable { webhook_type: String },
    /// Both branches ran.
    Completed(SyncReport),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_diagnostic("ok"), "ok");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let body = "é".repeat(600);
        let truncated = truncate_diagnostic(&body);
        assert_eq!(truncated.chars().count(), MAX_DIAGNOSTIC_CHARS);
    }

    #[test]
    fn skip_reasons_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_value(SkipReason::MissingSubscriptionCode).unwrap(),
            json!("missing-subscription-code")
        );
        assert_eq!(SkipReason::AlreadyExists.to_string(), "already-exists");
    }

    #[test]
    fn already_exists_carries_existing_id() {
        let outcome = PipelineOutcome::already_exists(DealId::new(1001));
        assert_eq!(outcome.skip_reason(), Some(SkipReason::AlreadyExists));
        assert_eq!(outcome.deal_id(), Some(DealId::new(1001)));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"result": "skipped", "reason": "already-exists", "deal_id": 1001})
        );
    }

    #[test]
    fn failed_outcome_keeps_downstream_details() {
        let err = SyncError::Downstream {
            message: "deal create failed".to_string(),
            status: Some(500),
            body: Some("x".repeat(2000)),
        };
        let outcome = PipelineOutcome::failed(&err);

        match outcome {
            PipelineOutcome::Failed {
                kind,
                status_code,
                body,
                ..
            } => {
                assert_eq!(kind, FailureKind::Downstream);
                assert_eq!(status_code, Some(500));
                assert_eq!(body.map(|b| b.len()), Some(MAX_DIAGNOSTIC_CHARS));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn configuration_errors_map_to_configuration_kind() {
        let outcome = PipelineOutcome::failed(&SyncError::configuration("no field key"));
        assert!(matches!(
            outcome,
            PipelineOutcome::Failed {
                kind: FailureKind::Configuration,
                ..
            }
        ));
    }

    #[test]
    fn list_outcome_serializes_with_result_tag() {
        let outcome = ListOutcome::Succeeded {
            action: ListAction::Subscribe,
            path: CallPath::Fallback,
            status_code: 202,
            body: String::new(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["result"], "succeeded");
        assert_eq!(value["path"], "fallback");
        assert_eq!(outcome.path(), Some(CallPath::Fallback));
    }

    #[test]
    fn report_is_ok_unless_pipeline_failed() {
        let report = SyncReport {
            invocation_id: Uuid::new_v4(),
            subscription_code: "sub_1".to_string(),
            pipeline: PipelineOutcome::skipped(SkipReason::StatusNotAllowed),
            list: ListOutcome::Failed {
                action: ListAction::Subscribe,
                primary: ListCallFailure {
                    path: CallPath::Primary,
                    error: "boom".to_string(),
                    status_code: Some(500),
                    body: None,
                },
                fallback: ListCallFailure {
                    path: CallPath::Fallback,
                    error: "boom".to_string(),
                    status_code: None,
                    body: None,
                },
            },
        };
        assert!(report.is_ok());
    }
}
