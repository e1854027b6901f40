//! Marketing list configuration (Klaviyo)

use std::time::Duration;

use serde::Deserialize;

use crate::adapters::klaviyo::{KlaviyoConfig, DEFAULT_REVISION};

use super::error::ValidationError;

/// Marketing list configuration
///
/// Both `api_key` and `list_id` are needed for list calls; without them the
/// list branch is skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct ListConfig {
    pub api_key: Option<String>,

    pub list_id: Option<String>,

    /// `revision` header value
    #[serde(default = "default_revision")]
    pub revision: String,

    pub base_url: Option<String>,

    /// `custom_source` attribute on subscribe jobs
    pub custom_source: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl ListConfig {
    pub fn adapter_config(&self) -> KlaviyoConfig {
        let config = KlaviyoConfig::new(self.api_key.clone(), self.list_id.clone())
            .with_revision(self.revision.trim())
            .with_custom_source(self.custom_source.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        match &self.base_url {
            Some(url) if !url.trim().is_empty() => config.with_base_url(url.trim()),
            _ => config,
        }
    }

    /// Validate list configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.revision.trim().is_empty() {
            return Err(ValidationError::MissingRequired("LIST__REVISION"));
        }
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidBaseUrl(url.to_string()));
            }
        }
        if !self.adapter_config().is_configured() {
            tracing::warn!("Marketing list not configured; list calls will be skipped");
        }
        Ok(())
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            list_id: None,
            revision: default_revision(),
            base_url: None,
            custom_source: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_revision() -> String {
    DEFAULT_REVISION.to_string()
}

fn default_timeout() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_unconfigured_but_valid() {
        let config = ListConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.adapter_config().is_configured());
        assert_eq!(config.revision, DEFAULT_REVISION);
    }

    #[test]
    fn test_key_and_list_configure_adapter() {
        let config = ListConfig {
            api_key: Some("pk_x".to_string()),
            list_id: Some("L1".to_string()),
            ..Default::default()
        };
        assert!(config.adapter_config().is_configured());
    }

    #[test]
    fn test_blank_revision_fails() {
        let config = ListConfig {
            revision: "".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("LIST__REVISION"))
        );
    }
}
