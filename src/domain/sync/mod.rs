//! Subscription synchronization domain.
//!
//! Classifies billing-platform subscription events and projects them into a
//! sales pipeline record and a marketing list membership.
//!
//! # Module Structure
//!
//! - `normalize` - Total normalization helpers (status, phone, dates)
//! - `event` - Raw event wrapper and canonical field extraction
//! - `policy` - Creation, cancellation and stage rules
//! - `projection` - Sale record payload construction
//! - `outcome` - Branch outcomes and the merged report
//! - `errors` - Synchronization error kinds

mod errors;
mod event;
mod ids;
mod normalize;
mod outcome;
mod policy;
mod projection;
mod settings;

pub use errors::SyncError;
pub use event::{
    CanonicalFields, ExtractionOptions, SubscriptionEvent, DEFAULT_PLAN_NAME,
    SUBSCRIPTION_WEBHOOK_TYPE, UNKNOWN_STATUS, UNNAMED_SUBSCRIBER,
};
pub use ids::{DealId, PersonId};
pub use normalize::{
    add_days, normalize_phone_digits, normalize_status, parse_date, resolve_expected_close_date,
    same_day_next_month, to_e164, ymd, CloseDateRule, DEFAULT_COUNTRY_CODE, FALLBACK_CLOSE_DAYS,
};
pub use outcome::{
    truncate_diagnostic, CallPath, FailureKind, ListAction, ListCallFailure, ListOutcome,
    ListSkipReason, PipelineOutcome, SkipReason, SyncOutcome, SyncReport, MAX_DIAGNOSTIC_CHARS,
};
pub use policy::{
    decide_list_action, decide_pipeline, is_cancellation_event, is_creatable_status,
    is_first_billing_cycle, resolve_target_stage, CreationPolicy, PipelineDecision, StageMap,
    StatusAllowList, DEFAULT_CREATABLE_STATUSES,
};
pub use projection::{
    build_sale_record_payload, build_title, ExtraField, ExtraFieldMap, ProjectionSettings,
    SaleRecordPayload, SparseFields, DEFAULT_CURRENCY, OPEN_STATUS,
};
pub use settings::{SyncSettings, DEFAULT_PERSON_VISIBILITY};
