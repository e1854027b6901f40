//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Request timeout of {request_secs}s must exceed {required_secs}s of downstream calls")]
    RequestTimeoutTooShort { request_secs: u64, required_secs: u64 },

    #[error("Pipeline id must be positive")]
    InvalidPipelineId,

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid extra field mapping: {0}")]
    InvalidExtraField(String),

    #[error("Country code must be 1 to 3 digits")]
    InvalidCountryCode,
}
