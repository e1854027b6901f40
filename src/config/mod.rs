//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `SUBSCRIPTION_BRIDGE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use subscription_bridge::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod error;
mod list;
mod pipeline;
mod policy;
mod server;
mod webhook;

pub use error::{ConfigError, ValidationError};
pub use list::ListConfig;
pub use pipeline::PipelineConfig;
pub use policy::PolicyConfig;
pub use server::{Environment, ServerConfig};
pub use webhook::WebhookConfig;

use serde::Deserialize;

use crate::domain::sync::SyncSettings;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Pipeline system credentials and identifiers
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Marketing list credentials
    #[serde(default)]
    pub list: ListConfig,

    /// Creation policy toggles
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Inbound webhook secret
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SUBSCRIPTION_BRIDGE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `SUBSCRIPTION_BRIDGE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SUBSCRIPTION_BRIDGE__PIPELINE__PIPELINE_ID=3` -> `pipeline.pipeline_id = 3`
    /// - `SUBSCRIPTION_BRIDGE__PIPELINE__EXTRA_FIELDS__UTM_SOURCE=f_utm`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SUBSCRIPTION_BRIDGE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.pipeline.validate()?;
        self.list.validate()?;
        self.policy.validate()?;
        self.validate_request_timeout()
    }

    /// The response deadline must outlast the slowest branch: four sequential
    /// pipeline calls, or a primary plus fallback list call.
    fn validate_request_timeout(&self) -> Result<(), ValidationError> {
        let required_secs = self
            .pipeline
            .timeout_secs
            .saturating_mul(4)
            .max(self.list.timeout_secs.saturating_mul(2));
        if self.server.request_timeout_secs <= required_secs {
            return Err(ValidationError::RequestTimeoutTooShort {
                request_secs: self.server.request_timeout_secs,
                required_secs,
            });
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// Immutable settings for the synchronization handler.
    pub fn sync_settings(&self) -> Result<SyncSettings, ValidationError> {
        Ok(SyncSettings {
            policy: self.policy.creation_policy(),
            extraction: self.policy.extraction_options(),
            projection: self.pipeline.projection_settings()?,
            person_owner_id: self.pipeline.person_owner_id,
            person_visible_to: self.pipeline.person_visible_to,
        })
    }
}
