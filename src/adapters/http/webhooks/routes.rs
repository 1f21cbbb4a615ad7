//! Route definitions for webhook ingestion.

use axum::routing::post;
use axum::Router;

use super::handlers::{handle_billing_webhook, WebhookAppState};

fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/billing", post(handle_billing_webhook))
}

/// Builds the webhook router, mounted at /webhooks.
pub fn webhook_router(state: WebhookAppState) -> Router {
    Router::new()
        .nest("/webhooks", webhook_routes())
        .with_state(state)
}
