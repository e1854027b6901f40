//! Axum router configuration for the subscription webhook.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{handle_subscription_webhook, health, panic_response, WebhookAppState};

/// Create the webhook router.
///
/// # Routes
/// - `POST /api/webhooks/subscription` - Process a subscription event
/// - `POST /api/guru` - Same handler, legacy path
/// - `GET /health` - Liveness probe
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new()
        .route("/api/webhooks/subscription", post(handle_subscription_webhook))
        .route("/api/guru", post(handle_subscription_webhook))
        .route("/health", get(health))
}

/// Complete application with state and middleware applied.
///
/// Panics become JSON 500 responses. A sync still running after
/// `request_timeout` is answered with a JSON 504 and left to finish.
pub fn app_router(state: WebhookAppState, request_timeout: Duration) -> Router {
    webhook_routes()
        .with_state(state.with_request_timeout(request_timeout))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::adapters::memory::{InMemoryListSystem, InMemoryPipelineSystem, PipelineOperation};
    use crate::application::handlers::subscription::SyncSubscriptionHandler;
    use crate::domain::sync::{ProjectionSettings, StageMap, SyncSettings};

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    fn settings() -> Arc<SyncSettings> {
        Arc::new(SyncSettings {
            projection: ProjectionSettings {
                pipeline_id: 1,
                stages: StageMap {
                    onboarding: Some(10),
                    pending: Some(11),
                    churn: None,
                },
                subscription_field: Some("sub_field".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn app_with(pipeline: InMemoryPipelineSystem, secret: Option<&str>) -> Router {
        app_with_timeout(pipeline, InMemoryListSystem::new(), secret, Duration::from_secs(5))
    }

    fn app_with_timeout(
        pipeline: InMemoryPipelineSystem,
        list: InMemoryListSystem,
        secret: Option<&str>,
        timeout: Duration,
    ) -> Router {
        let handler = SyncSubscriptionHandler::new(Arc::new(pipeline), Arc::new(list), settings());
        let state = WebhookAppState::new(
            Arc::new(handler),
            secret.map(|s| SecretString::new(s.to_string())),
        );
        app_router(state, timeout)
    }

    fn app() -> Router {
        app_with(InMemoryPipelineSystem::new(), None)
    }

    fn active_event() -> Value {
        json!({
            "webhook_type": "subscription",
            "subscription_code": "sub_1",
            "last_status": "active",
            "subscriber": {"name": "Ana", "email": "ana@example.com"},
            "product": {"name": "Mensal"},
            "current_invoice": {"value": 49.9, "cycle": 1}
        })
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Routing
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn health_returns_ok() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"ok": true}));
    }

    #[tokio::test]
    async fn get_on_webhook_path_is_method_not_allowed() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/webhooks/subscription")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn both_paths_process_events() {
        for uri in ["/api/webhooks/subscription", "/api/guru"] {
            let response = app().oneshot(post_json(uri, &active_event())).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rejections
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/webhooks/subscription")
            .body(Body::from("{oops"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"ok": false, "error": "Invalid JSON body"})
        );
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthorized() {
        let app = app_with(InMemoryPipelineSystem::new(), Some("s3cret"));
        let response = app
            .oneshot(post_json("/api/webhooks/subscription?secret=nope", &active_event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"ok": false, "error": "invalid token"})
        );
    }

    #[tokio::test]
    async fn body_token_takes_precedence_over_query() {
        let app = app_with(InMemoryPipelineSystem::new(), Some("s3cret"));
        let mut event = active_event();
        event["api_token"] = json!("s3cret");

        let response = app
            .oneshot(post_json("/api/webhooks/subscription?secret=nope", &event))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn header_secret_is_accepted() {
        let app = app_with(InMemoryPipelineSystem::new(), Some("s3cret"));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/guru")
            .header("x-webhook-secret", "s3cret")
            .body(Body::from(active_event().to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Outcomes
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn other_event_type_is_accepted_and_skipped() {
        let response = app()
            .oneshot(post_json(
                "/api/webhooks/subscription",
                &json!({"webhook_type": "transaction"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["skipped"], true);
        assert_eq!(body["reason"], "not-applicable");
        assert_eq!(body["webhook_type"], "transaction");
    }

    #[tokio::test]
    async fn json_string_body_is_processed() {
        let wrapped = Value::String(active_event().to_string());
        let response = app()
            .oneshot(post_json("/api/webhooks/subscription", &wrapped))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["pipeline"]["result"], "created");
    }

    #[tokio::test]
    async fn downstream_failure_is_bad_gateway() {
        let pipeline = InMemoryPipelineSystem::new();
        pipeline.fail_on(PipelineOperation::CreateDeal).await;

        let response = app_with(pipeline, None)
            .oneshot(post_json("/api/webhooks/subscription", &active_event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["pipeline"]["result"], "failed");
        assert_eq!(body["list"]["result"], "succeeded");
    }

    #[tokio::test]
    async fn slow_sync_answers_json_gateway_timeout_and_keeps_running() {
        let pipeline = InMemoryPipelineSystem::new().with_latency(Duration::from_millis(300));
        let list = InMemoryListSystem::new();
        let app = app_with_timeout(
            pipeline.clone(),
            list.clone(),
            None,
            Duration::from_millis(100),
        );

        let response = app
            .oneshot(post_json("/api/webhooks/subscription", &active_event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = body_json(response).await;
        assert_eq!(body["ok"], false);
        assert!(body["error"].as_str().unwrap().contains("timed out"));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(pipeline.deals().await.len(), 1);
        assert!(list.is_subscribed("ana@example.com").await);
    }
}
