//! Klaviyo list system adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::domain::sync::CallPath;
use crate::ports::{ListError, ListRequest, ListResponse, ListSystem};

use super::bodies;

/// Default Klaviyo API base URL.
pub const DEFAULT_BASE_URL: &str = "https://a.klaviyo.com";

/// Default API revision header value.
pub const DEFAULT_REVISION: &str = "2024-10-15";

const JSON_API: &str = "application/vnd.api+json";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Klaviyo API configuration.
#[derive(Clone)]
pub struct KlaviyoConfig {
    /// Private API key.
    api_key: Option<SecretString>,

    /// Target list.
    list_id: Option<String>,

    /// `revision` header value.
    revision: String,

    /// Base URL (default: https://a.klaviyo.com).
    api_base_url: String,

    /// Optional `custom_source` attribute on subscribe jobs.
    custom_source: Option<String>,

    /// Per-request timeout.
    timeout: Duration,
}

impl KlaviyoConfig {
    pub fn new(api_key: Option<String>, list_id: Option<String>) -> Self {
        Self {
            api_key: api_key
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::new),
            list_id: list_id.filter(|l| !l.trim().is_empty()),
            revision: DEFAULT_REVISION.to_string(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            custom_source: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_custom_source(mut self, source: Option<String>) -> Self {
        self.custom_source = source.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.list_id.is_some()
    }
}

/// Klaviyo list system adapter.
pub struct KlaviyoAdapter {
    config: KlaviyoConfig,
    http_client: reqwest::Client,
}

impl KlaviyoAdapter {
    pub fn new(config: KlaviyoConfig) -> Self {
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

    fn list_id(&self) -> Result<&str, ListError> {
        self.config
            .list_id
            .as_deref()
            .ok_or_else(|| ListError::network("list id is not configured"))
    }

    async fn post_job(&self, path: &str, body: &Value) -> Result<ListResponse, ListError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ListError::network("api key is not configured"))?;

        let response = self
            .http_client
            .post(format!("{}{}", self.config.api_base_url, path))
            .header(AUTHORIZATION, format!("Klaviyo-API-Key {}", api_key.expose_secret()))
            .header("revision", &self.config.revision)
            .header(ACCEPT, JSON_API)
            .header(CONTENT_TYPE, JSON_API)
            .json(body)
            .send()
            .await
            .map_err(|e| ListError::network(format!("list request failed: {}", e)))?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        if !(200..300).contains(&status) {
            return Err(ListError::rejected(status, &text));
        }
        Ok(ListResponse::new(status, &text))
    }
}

#[async_trait]
impl ListSystem for KlaviyoAdapter {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn subscribe(
        &self,
        request: &ListRequest,
        path: CallPath,
    ) -> Result<ListResponse, ListError> {
        let list_id = self.list_id()?;
        let source = self.config.custom_source.as_deref();
        let phone = request.phone.as_deref();

        let body = match path {
            CallPath::Primary => bodies::subscribe_primary(list_id, &request.email, phone, source),
            CallPath::Fallback => bodies::subscribe_fallback(list_id, &request.email, phone, source),
        };
        self.post_job("/api/profile-subscription-bulk-create-jobs/", &body)
            .await
    }

    async fn unsubscribe(
        &self,
        request: &ListRequest,
        path: CallPath,
    ) -> Result<ListResponse, ListError> {
        let list_id = self.list_id()?;

        let body = match path {
            CallPath::Primary => bodies::unsubscribe_primary(list_id, &request.email),
            CallPath::Fallback => bodies::unsubscribe_fallback(list_id, &request.email),
        };
        self.post_job("/api/profile-subscription-bulk-delete-jobs/", &body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    async fn serve(router: Router) -> KlaviyoAdapter {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let config = KlaviyoConfig::new(Some("pk_test".to_string()), Some("L1".to_string()))
            .with_base_url(format!("http://{}", addr));
        KlaviyoAdapter::new(config)
    }

    fn request() -> ListRequest {
        ListRequest {
            email: "ana@example.com".to_string(),
            phone: None,
        }
    }

    #[test]
    fn configuration_requires_key_and_list() {
        assert!(KlaviyoConfig::new(Some("k".into()), Some("L".into())).is_configured());
        assert!(!KlaviyoConfig::new(None, Some("L".into())).is_configured());
        assert!(!KlaviyoConfig::new(Some("k".into()), Some(" ".into())).is_configured());
    }

    #[tokio::test]
    async fn subscribe_sends_auth_and_revision_headers() {
        let router = Router::new().route(
            "/api/profile-subscription-bulk-create-jobs/",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Klaviyo-API-Key pk_test");
                assert_eq!(headers["revision"], DEFAULT_REVISION);
                assert_eq!(body["data"]["relationships"]["list"]["data"]["id"], "L1");
                StatusCode::ACCEPTED
            }),
        );
        let adapter = serve(router).await;

        let response = adapter.subscribe(&request(), CallPath::Primary).await.unwrap();
        assert_eq!(response.status, 202);
    }

    #[tokio::test]
    async fn rejected_job_reports_status_and_body() {
        let router = Router::new().route(
            "/api/profile-subscription-bulk-delete-jobs/",
            post(|| async { (StatusCode::BAD_REQUEST, "invalid list") }),
        );
        let adapter = serve(router).await;

        let err = adapter.unsubscribe(&request(), CallPath::Fallback).await.unwrap_err();
        assert_eq!(err.status, Some(400));
        assert_eq!(err.body.as_deref(), Some("invalid list"));
    }
}
