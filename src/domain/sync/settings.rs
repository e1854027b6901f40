//! Immutable settings consumed by one synchronization.

use super::event::ExtractionOptions;
use super::policy::CreationPolicy;
use super::projection::ProjectionSettings;

/// Default visibility of persons created in the pipeline system.
pub const DEFAULT_PERSON_VISIBILITY: i64 = 3;

/// Everything the orchestrator needs besides the downstream systems.
///
/// Built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub policy: CreationPolicy,
    pub extraction: ExtractionOptions,
    pub projection: ProjectionSettings,
    pub person_owner_id: Option<i64>,
    pub person_visible_to: Option<i64>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            policy: CreationPolicy::default(),
            extraction: ExtractionOptions::default(),
            projection: ProjectionSettings::default(),
            person_owner_id: None,
            person_visible_to: Some(DEFAULT_PERSON_VISIBILITY),
        }
    }
}
