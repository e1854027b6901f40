//! Classification rules for subscription events.
//!
//! Pure functions only. The orchestrator decides *when* to call the
//! downstream systems; these functions decide *whether* it should.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::event::{CanonicalFields, SubscriptionEvent};
use super::normalize::normalize_status;
use super::outcome::{ListAction, SkipReason};

/// Statuses allowed to create a sale record when none are configured.
pub const DEFAULT_CREATABLE_STATUSES: &[&str] =
    &["ativa", "iniciada", "trial", "active", "started", "trialing"];

static CANCELLATION_STATUSES: Lazy<Vec<String>> = Lazy::new(|| {
    ["cancelada", "cancelado", "canceled", "cancelled", "cancelamento"]
        .iter()
        .map(|s| normalize_status(s))
        .collect()
});

static PENDING_INVOICE_STATUSES: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "unpaid",
        "overdue",
        "pending",
        "pendente",
        "atrasada",
        "vencida",
        "não paga",
        "em aberto",
    ]
    .iter()
    .map(|s| normalize_status(s))
    .collect()
});

/// Normalized set of statuses that may create a sale record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusAllowList(Vec<String>);

impl StatusAllowList {
    pub fn new<I, S>(statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = statuses
            .into_iter()
            .map(|s| normalize_status(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();
        Self(normalized)
    }

    /// Parses a comma-separated list such as `"ativa,trial"`.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn contains(&self, status: &str) -> bool {
        let normalized = normalize_status(status);
        self.0.iter().any(|allowed| *allowed == normalized)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn statuses(&self) -> &[String] {
        &self.0
    }
}

impl Default for StatusAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_CREATABLE_STATUSES.iter())
    }
}

/// Pipeline stage ids by purpose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMap {
    pub onboarding: Option<i64>,
    pub pending: Option<i64>,
    pub churn: Option<i64>,
}

/// Creation rules that vary between deployments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationPolicy {
    pub allow_list: StatusAllowList,
    /// Only create on the subscription's first billing cycle.
    pub first_cycle_only: bool,
}

/// What the pipeline branch should do for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineDecision {
    /// Look up by subscription code and create if absent.
    Create,
    /// Do nothing.
    Skip(SkipReason),
}

pub fn is_creatable_status(status: &str, allow_list: &StatusAllowList) -> bool {
    allow_list.contains(status)
}

/// True for cancellation-shaped events.
///
/// Any one signal is enough: a cancellation status, a cancel-at-cycle-end
/// flag, a cancellation timestamp, or a non-empty cancellation reason.
pub fn is_cancellation_event(event: &SubscriptionEvent) -> bool {
    let status = normalize_status(&event.text(&["last_status"]).unwrap_or_default());
    if is_cancellation_status(&status) {
        return true;
    }

    if event.flag(&["cancel_at_cycle_end"]) || event.flag(&["dates", "cancel_at_cycle_end"]) {
        return true;
    }

    let cancelled_at = event.first_text(&[
        &["canceled_at"],
        &["cancelled_at"],
        &["dates", "canceled_at"],
        &["dates", "cancelled_at"],
    ]);
    if cancelled_at.is_some() {
        return true;
    }

    event.text(&["cancel_reason"]).is_some()
}

fn is_cancellation_status(status: &str) -> bool {
    let normalized = normalize_status(status);
    CANCELLATION_STATUSES.iter().any(|s| *s == normalized)
}

pub fn is_first_billing_cycle(fields: &CanonicalFields) -> bool {
    fields.billing_cycle_number == 1
}

/// Picks the stage a new sale record should enter.
///
/// Returns `None` when no onboarding stage is configured; callers must then
/// create the record without a stage.
pub fn resolve_target_stage(status: &str, invoice_status: &str, stages: &StageMap) -> Option<i64> {
    let onboarding = stages.onboarding?;

    if is_cancellation_status(status) {
        return Some(stages.churn.unwrap_or(onboarding));
    }

    let invoice = normalize_status(invoice_status);
    if PENDING_INVOICE_STATUSES.iter().any(|s| *s == invoice) {
        return Some(stages.pending.unwrap_or(onboarding));
    }

    Some(onboarding)
}

/// Decides the pipeline branch, in priority order.
pub fn decide_pipeline(fields: &CanonicalFields, policy: &CreationPolicy) -> PipelineDecision {
    if fields.is_cancellation {
        return PipelineDecision::Skip(SkipReason::CancellationEvent);
    }
    if !fields.has_subscription_code() {
        return PipelineDecision::Skip(SkipReason::MissingSubscriptionCode);
    }
    if !is_creatable_status(&fields.last_status, &policy.allow_list) {
        return PipelineDecision::Skip(SkipReason::StatusNotAllowed);
    }
    if policy.first_cycle_only && !is_first_billing_cycle(fields) {
        return PipelineDecision::Skip(SkipReason::NotFirstCycle);
    }
    PipelineDecision::Create
}

/// Decides the list branch: cancellations unsubscribe, creatable statuses subscribe.
pub fn decide_list_action(fields: &CanonicalFields, policy: &CreationPolicy) -> ListAction {
    if fields.is_cancellation {
        ListAction::Unsubscribe
    } else if is_creatable_status(&fields.last_status, &policy.allow_list) {
        ListAction::Subscribe
    } else {
        ListAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sync::event::ExtractionOptions;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn event(value: Value) -> SubscriptionEvent {
        SubscriptionEvent::from_value(value).unwrap()
    }

    fn fields(value: Value) -> CanonicalFields {
        CanonicalFields::extract_at(
            &event(value),
            &ExtractionOptions::default(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        )
    }

    fn stages() -> StageMap {
        StageMap {
            onboarding: Some(10),
            pending: Some(11),
            churn: Some(12),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Allow-list
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn default_allow_list_accepts_both_languages() {
        let allow = StatusAllowList::default();
        for status in ["ativa", "Iniciada", "TRIAL", "active", "started", "trialing"] {
            assert!(is_creatable_status(status, &allow), "{status} should be creatable");
        }
    }

    #[test]
    fn allow_list_rejects_other_statuses() {
        let allow = StatusAllowList::default();
        for status in ["cancelada", "unknown", "", "paused", "atrasada"] {
            assert!(!is_creatable_status(status, &allow), "{status} should not be creatable");
        }
    }

    #[test]
    fn allow_list_from_csv_normalizes_entries() {
        let allow = StatusAllowList::from_csv(" Ativa , INICIADÁ,,trial ");
        assert_eq!(allow.statuses(), &["ativa", "iniciada", "trial"]);
        assert!(allow.contains("iniciada"));
    }

    // ══════════════════════════════════════════════════════════════
    // Cancellation signals
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn cancellation_by_status() {
        assert!(is_cancellation_event(&event(json!({"last_status": "Cancelada"}))));
        assert!(is_cancellation_event(&event(json!({"last_status": "canceled"}))));
    }

    #[test]
    fn cancellation_by_cycle_end_flag() {
        assert!(is_cancellation_event(&event(json!({
            "last_status": "active",
            "cancel_at_cycle_end": true
        }))));
        assert!(is_cancellation_event(&event(json!({
            "dates": {"cancel_at_cycle_end": "1"}
        }))));
    }

    #[test]
    fn cancellation_by_timestamp() {
        assert!(is_cancellation_event(&event(json!({
            "last_status": "active",
            "dates": {"canceled_at": "2024-04-02 10:00:00"}
        }))));
    }

    #[test]
    fn cancellation_by_reason() {
        assert!(is_cancellation_event(&event(json!({"cancel_reason": "too expensive"}))));
        assert!(!is_cancellation_event(&event(json!({"cancel_reason": "  "}))));
    }

    #[test]
    fn active_event_without_signals_is_not_cancellation() {
        assert!(!is_cancellation_event(&event(json!({
            "last_status": "ativa",
            "cancel_at_cycle_end": false,
            "canceled_at": null
        }))));
    }

    #[test]
    fn boolean_timestamp_and_reason_are_not_cancellation_signals() {
        assert!(!is_cancellation_event(&event(json!({
            "last_status": "ativa",
            "cancel_reason": false,
            "canceled_at": false,
            "dates": {"cancelled_at": true}
        }))));
    }

    #[test]
    fn numeric_timestamp_is_a_cancellation_signal() {
        assert!(is_cancellation_event(&event(json!({
            "last_status": "ativa",
            "canceled_at": 1714521600
        }))));
    }

    // ══════════════════════════════════════════════════════════════
    // Stage resolution
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn stage_for_active_paid_is_onboarding() {
        assert_eq!(resolve_target_stage("ativa", "paid", &stages()), Some(10));
    }

    #[test]
    fn stage_for_unpaid_invoice_is_pending() {
        assert_eq!(resolve_target_stage("ativa", "Atrasada", &stages()), Some(11));
        assert_eq!(resolve_target_stage("active", "overdue", &stages()), Some(11));
    }

    #[test]
    fn stage_for_cancellation_is_churn() {
        assert_eq!(resolve_target_stage("cancelada", "paid", &stages()), Some(12));
    }

    #[test]
    fn missing_optional_stages_fall_back_to_onboarding() {
        let only_onboarding = StageMap {
            onboarding: Some(10),
            ..Default::default()
        };
        assert_eq!(resolve_target_stage("cancelada", "", &only_onboarding), Some(10));
        assert_eq!(resolve_target_stage("ativa", "pending", &only_onboarding), Some(10));
    }

    #[test]
    fn no_onboarding_stage_means_no_stage() {
        let no_onboarding = StageMap {
            onboarding: None,
            pending: Some(11),
            churn: Some(12),
        };
        assert_eq!(resolve_target_stage("ativa", "pending", &no_onboarding), None);
    }

    // ══════════════════════════════════════════════════════════════
    // Decisions
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn cancellation_skips_pipeline_and_unsubscribes() {
        let f = fields(json!({"last_status": "cancelada", "subscription_code": "sub_1"}));
        let policy = CreationPolicy::default();

        assert_eq!(
            decide_pipeline(&f, &policy),
            PipelineDecision::Skip(SkipReason::CancellationEvent)
        );
        assert_eq!(decide_list_action(&f, &policy), ListAction::Unsubscribe);
    }

    #[test]
    fn missing_code_is_checked_before_status() {
        let f = fields(json!({"last_status": "paused"}));
        assert_eq!(
            decide_pipeline(&f, &CreationPolicy::default()),
            PipelineDecision::Skip(SkipReason::MissingSubscriptionCode)
        );
    }

    #[test]
    fn disallowed_status_skips_without_list_action() {
        let f = fields(json!({"last_status": "paused", "subscription_code": "sub_1"}));
        let policy = CreationPolicy::default();

        assert_eq!(
            decide_pipeline(&f, &policy),
            PipelineDecision::Skip(SkipReason::StatusNotAllowed)
        );
        assert_eq!(decide_list_action(&f, &policy), ListAction::None);
    }

    #[test]
    fn first_cycle_policy_only_applies_when_enabled() {
        let renewal = fields(json!({
            "last_status": "ativa",
            "subscription_code": "sub_1",
            "current_invoice": {"cycle": 3}
        }));

        assert_eq!(
            decide_pipeline(&renewal, &CreationPolicy::default()),
            PipelineDecision::Create
        );

        let strict = CreationPolicy {
            first_cycle_only: true,
            ..Default::default()
        };
        assert_eq!(
            decide_pipeline(&renewal, &strict),
            PipelineDecision::Skip(SkipReason::NotFirstCycle)
        );
    }

    #[test]
    fn first_cycle_event_creates_under_strict_policy() {
        let first = fields(json!({
            "last_status": "ativa",
            "subscription_code": "sub_1",
            "current_invoice": {"cycle": 1}
        }));
        let strict = CreationPolicy {
            first_cycle_only: true,
            ..Default::default()
        };

        assert!(is_first_billing_cycle(&first));
        assert_eq!(decide_pipeline(&first, &strict), PipelineDecision::Create);
        assert_eq!(decide_list_action(&first, &strict), ListAction::Subscribe);
    }

    proptest! {
        #[test]
        fn statuses_outside_allow_list_are_never_creatable(s in "[a-z]{1,12}") {
            let allow = StatusAllowList::default();
            let expected = DEFAULT_CREATABLE_STATUSES.contains(&s.as_str());
            prop_assert_eq!(is_creatable_status(&s, &allow), expected);
        }

        #[test]
        fn allow_list_ignores_case(s in "(ativa|iniciada|trial|active|started|trialing)") {
            let allow = StatusAllowList::default();
            prop_assert!(is_creatable_status(&s.to_uppercase(), &allow));
        }
    }
}
