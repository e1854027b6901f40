//! Subscription Bridge server binary.

use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use subscription_bridge::adapters::http::{app_router, WebhookAppState};
use subscription_bridge::adapters::{KlaviyoAdapter, PipedriveAdapter};
use subscription_bridge::application::SyncSubscriptionHandler;
use subscription_bridge::config::{AppConfig, ConfigError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    config.validate().map_err(ConfigError::from)?;
    let settings = Arc::new(config.sync_settings().map_err(ConfigError::from)?);
    let addr = config.server.socket_addr().map_err(ConfigError::from)?;

    let pipeline = Arc::new(PipedriveAdapter::new(config.pipeline.adapter_config()));
    let list = Arc::new(KlaviyoAdapter::new(config.list.adapter_config()));
    let handler = Arc::new(SyncSubscriptionHandler::new(pipeline, list, settings));

    let state = WebhookAppState::new(handler, config.webhook.secret());
    let app = app_router(state, config.server.request_timeout());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        secret_required = config.webhook.secret().is_some(),
        "Subscription bridge listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Subscription bridge stopped");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` wins over
/// the configured filter.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
