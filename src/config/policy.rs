//! Creation policy configuration

use serde::Deserialize;

use crate::domain::sync::{
    CloseDateRule, CreationPolicy, ExtractionOptions, StatusAllowList, DEFAULT_COUNTRY_CODE,
};

use super::error::ValidationError;

/// Creation policy and normalization options
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Comma-separated creatable statuses; the built-in list when unset
    pub allowed_statuses: Option<String>,

    /// Only create sale records on the first billing cycle
    #[serde(default)]
    pub first_cycle_only: bool,

    #[serde(default)]
    pub close_date_rule: CloseDateRule,

    /// Calling code prefixed to national phone numbers
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

impl PolicyConfig {
    pub fn creation_policy(&self) -> CreationPolicy {
        let allow_list = match self.allowed_statuses.as_deref() {
            Some(csv) if !csv.trim().is_empty() => StatusAllowList::from_csv(csv),
            _ => StatusAllowList::default(),
        };
        CreationPolicy {
            allow_list,
            first_cycle_only: self.first_cycle_only,
        }
    }

    pub fn extraction_options(&self) -> ExtractionOptions {
        ExtractionOptions {
            country_code: self.country_code.trim().to_string(),
            close_date_rule: self.close_date_rule,
        }
    }

    /// Validate policy configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let code = self.country_code.trim();
        if code.is_empty() || code.len() > 3 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidCountryCode);
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_statuses: None,
            first_cycle_only: false,
            close_date_rule: CloseDateRule::default(),
            country_code: default_country_code(),
        }
    }
}

fn default_country_code() -> String {
    DEFAULT_COUNTRY_CODE.to_string()
}
