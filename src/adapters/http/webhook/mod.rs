//! HTTP adapter for the subscription webhook.
//!
//! Decodes the delivered body, checks the shared secret and hands the event
//! to the synchronization handler.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, HealthResponse, NotApplicableResponse, SyncResponse};
pub use handlers::{
    decode_body, extract_secret, handle_subscription_webhook, health, panic_response,
    verify_secret, WebhookApiError, WebhookAppState, SECRET_HEADER,
};
pub use routes::{app_router, webhook_routes};
