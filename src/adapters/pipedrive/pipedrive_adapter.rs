//! Pipedrive pipeline system adapter.
//!
//! Implements the `PipelineSystem` trait against the Pipedrive REST API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = PipedriveConfig::new("acme", api_token);
//! let adapter = PipedriveAdapter::new(config);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::sync::{DealId, PersonId, SaleRecordPayload};
use crate::ports::{NewPerson, PipelineError, PipelineSystem};

use super::types::{CreatedRecord, DealRecord, Envelope, PersonBody, SearchData};

/// Default timeout for a single Pipedrive request.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Pipedrive API configuration.
#[derive(Clone)]
pub struct PipedriveConfig {
    /// API token, sent as the `api_token` query parameter.
    api_token: SecretString,

    /// Base URL (default: `https://<domain>.pipedrive.com`).
    api_base_url: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl PipedriveConfig {
    /// Create a configuration for the company `domain`.
    pub fn new(domain: &str, api_token: impl Into<String>) -> Self {
        Self {
            api_token: SecretString::new(api_token.into()),
            api_base_url: format!("https://{}.pipedrive.com", domain.trim()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.api_base_url
    }
}

/// Pipedrive pipeline system adapter.
pub struct PipedriveAdapter {
    config: PipedriveConfig,
    http_client: reqwest::Client,
}

impl PipedriveAdapter {
    pub fn new(config: PipedriveConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            config,
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Sends a request and unwraps the response envelope.
    ///
    /// Any non-2xx status or `success: false` is an error carrying the
    /// status and the (truncated) body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<Option<T>, PipelineError> {
        let response = request
            .query(&[("api_token", self.config.api_token.expose_secret().as_str())])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(operation, error = %e, "Pipedrive request failed");
                PipelineError::network(format!("{} request failed: {}", operation, e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::network(format!("{} body unreadable: {}", operation, e)))?;

        if !status.is_success() {
            tracing::error!(operation, status = status.as_u16(), "Pipedrive rejected request");
            return Err(PipelineError::rejected(status.as_u16(), &body));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            PipelineError::invalid_response(format!("{} response unparseable: {}", operation, e))
                .with_status(status.as_u16())
                .with_body(&body)
        })?;

        if envelope.success == Some(false) {
            tracing::error!(operation, status = status.as_u16(), "Pipedrive reported failure");
            return Err(PipelineError::rejected(status.as_u16(), &body));
        }

        Ok(envelope.data)
    }
}

#[async_trait]
impl PipelineSystem for PipedriveAdapter {
    async fn find_person_by_email(&self, email: &str) -> Result<Option<PersonId>, PipelineError> {
        let request = self.http_client.get(self.url("/api/v2/persons/search")).query(&[
            ("term", email),
            ("fields", "email"),
            ("exact_match", "true"),
        ]);

        let data: Option<SearchData> = self.send(request, "person search").await?;
        Ok(data.and_then(|d| d.first_id()).map(PersonId::new))
    }

    async fn create_person(&self, person: &NewPerson) -> Result<Option<PersonId>, PipelineError> {
        let request = self
            .http_client
            .post(self.url("/api/v1/persons"))
            .json(&PersonBody::from(person));

        let data: Option<CreatedRecord> = self.send(request, "person create").await?;
        Ok(data.and_then(|d| d.id).map(PersonId::new))
    }

    async fn find_deal_by_field(
        &self,
        field_key: &str,
        value: &str,
    ) -> Result<Option<DealId>, PipelineError> {
        // v2 search cannot target one custom field; it matches all of them.
        let request = self.http_client.get(self.url("/api/v2/deals/search")).query(&[
            ("term", value),
            ("fields", "custom_fields"),
            ("exact_match", "true"),
        ]);

        let Some(data) = self.send::<SearchData>(request, "deal search").await? else {
            return Ok(None);
        };

        for id in data.ids() {
            let request = self.http_client.get(self.url(&format!("/api/v1/deals/{}", id)));
            let record: Option<DealRecord> = self.send(request, "deal fetch").await?;
            if record.is_some_and(|r| r.field_equals(field_key, value)) {
                return Ok(Some(DealId::new(id)));
            }
            tracing::debug!(deal_id = id, field_key, "Search hit holds the code in another field");
        }
        Ok(None)
    }

    async fn create_deal(&self, deal: &SaleRecordPayload) -> Result<Option<DealId>, PipelineError> {
        let request = self.http_client.post(self.url("/api/v1/deals")).json(deal);

        let data: Option<CreatedRecord> = self.send(request, "deal create").await?;
        Ok(data.and_then(|d| d.id).map(DealId::new))
    }
}
