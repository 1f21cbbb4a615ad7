//! Billing Sync server entry point.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use billing_sync::adapters::http::webhooks::{webhook_router, WebhookAppState};
use billing_sync::adapters::postgres::{PostgresAccountResolver, PostgresEventLedger};
use billing_sync::application::handlers::webhooks::EventTypeDispatcher;
use billing_sync::config::AppConfig;
use billing_sync::domain::billing::{WebhookPipeline, WebhookVerifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        "starting billing-sync"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    let ledger = Arc::new(PostgresEventLedger::new(pool.clone()));
    let resolver = Arc::new(PostgresAccountResolver::new(pool));
    let dispatcher = Arc::new(EventTypeDispatcher::with_default_handlers(resolver));
    let pipeline = Arc::new(WebhookPipeline::new(ledger, dispatcher));
    let verifier = Arc::new(WebhookVerifier::new(&config.billing.webhook_secret));

    let state = WebhookAppState::new(verifier, pipeline);
    let app = webhook_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "listening for webhook deliveries");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
