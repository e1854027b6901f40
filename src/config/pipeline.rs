//! Pipeline system configuration (Pipedrive)

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::adapters::pipedrive::PipedriveConfig;
use crate::domain::sync::{
    ExtraFieldMap, ProjectionSettings, StageMap, DEFAULT_CURRENCY, DEFAULT_PERSON_VISIBILITY,
};

use super::error::ValidationError;

/// Pipeline system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Company domain, as in `https://<domain>.pipedrive.com`
    #[serde(default)]
    pub domain: String,

    /// API token
    #[serde(default)]
    pub api_token: String,

    /// Overrides the base URL derived from `domain`
    pub base_url: Option<String>,

    /// Pipeline that new sale records are placed in
    #[serde(default)]
    pub pipeline_id: i64,

    pub stage_onboarding_id: Option<i64>,
    pub stage_pending_id: Option<i64>,
    pub stage_churn_id: Option<i64>,

    /// Custom-field key holding the subscription code
    pub subscription_field_key: Option<String>,

    pub person_owner_id: Option<i64>,
    pub deal_owner_id: Option<i64>,

    #[serde(default = "default_person_visible_to")]
    pub person_visible_to: Option<i64>,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Optional attribute name to custom-field key
    #[serde(default)]
    pub extra_fields: HashMap<String, String>,
}

impl PipelineConfig {
    pub fn stages(&self) -> StageMap {
        StageMap {
            onboarding: self.stage_onboarding_id,
            pending: self.stage_pending_id,
            churn: self.stage_churn_id,
        }
    }

    /// Adapter configuration for the HTTP client.
    pub fn adapter_config(&self) -> PipedriveConfig {
        let config = PipedriveConfig::new(&self.domain, self.api_token.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        match &self.base_url {
            Some(url) if !url.trim().is_empty() => config.with_base_url(url.trim()),
            _ => config,
        }
    }

    /// Projection settings for the sale record payload.
    pub fn projection_settings(&self) -> Result<ProjectionSettings, ValidationError> {
        let extra_fields = ExtraFieldMap::from_config(&self.extra_fields)
            .map_err(ValidationError::InvalidExtraField)?;

        Ok(ProjectionSettings {
            pipeline_id: self.pipeline_id,
            stages: self.stages(),
            currency: self.currency.trim().to_string(),
            deal_owner_id: self.deal_owner_id,
            subscription_field: self
                .subscription_field_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            extra_fields,
        })
    }

    /// Validate pipeline configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_base_url = self
            .base_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty());

        if self.domain.trim().is_empty() && !has_base_url {
            return Err(ValidationError::MissingRequired("PIPELINE__DOMAIN"));
        }
        if self.api_token.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PIPELINE__API_TOKEN"));
        }
        if self.pipeline_id <= 0 {
            return Err(ValidationError::InvalidPipelineId);
        }
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidBaseUrl(url.to_string()));
            }
        }
        if self.subscription_field_key.is_none() {
            tracing::warn!("No subscription field key configured; pipeline creation will fail");
        }
        self.projection_settings()?;
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            api_token: String::new(),
            base_url: None,
            pipeline_id: 0,
            stage_onboarding_id: None,
            stage_pending_id: None,
            stage_churn_id: None,
            subscription_field_key: None,
            person_owner_id: None,
            deal_owner_id: None,
            person_visible_to: default_person_visible_to(),
            currency: default_currency(),
            timeout_secs: default_timeout(),
            extra_fields: HashMap::new(),
        }
    }
}

fn default_person_visible_to() -> Option<i64> {
    Some(DEFAULT_PERSON_VISIBILITY)
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_timeout() -> u64 {
    15
}
