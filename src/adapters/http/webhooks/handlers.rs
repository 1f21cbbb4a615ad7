//! HTTP handlers for webhook ingestion.
//!
//! The endpoint consumes the raw body bytes; signature verification runs
//! over the exact bytes the provider signed, so the body must never pass
//! through a JSON extractor first.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::application::handlers::webhooks::{IngestWebhookCommand, IngestWebhookHandler};
use crate::domain::billing::{WebhookError, WebhookPipeline, WebhookVerifier};

use super::dto::{ErrorResponse, WebhookAckResponse};

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "Billing-Signature";

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookAppState {
    pub verifier: Arc<WebhookVerifier>,
    pub pipeline: Arc<WebhookPipeline>,
}

impl WebhookAppState {
    pub fn new(verifier: Arc<WebhookVerifier>, pipeline: Arc<WebhookPipeline>) -> Self {
        Self { verifier, pipeline }
    }

    fn ingest_handler(&self) -> IngestWebhookHandler {
        IngestWebhookHandler::new(self.verifier.clone(), self.pipeline.clone())
    }
}

/// POST /webhooks/billing
///
/// Returns 200 for both fresh and duplicate deliveries; the provider only
/// needs to know the event is safely recorded.
pub async fn handle_billing_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let command = IngestWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    state.ingest_handler().handle(command).await?;

    Ok((StatusCode::OK, Json(WebhookAckResponse::ok())))
}

/// Maps webhook errors onto HTTP responses.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = err.status_code();

        if status.is_server_error() {
            tracing::error!(error = %err, "webhook ingestion failed");
        } else {
            tracing::warn!(error = %err, "webhook delivery rejected");
        }

        // Unresolved accounts are acknowledged; everything the provider
        // needs is in the 200.
        if status == StatusCode::OK {
            return (status, Json(WebhookAckResponse::ok())).into_response();
        }

        let body = ErrorResponse::new(err.error_code(), err.to_string());
        (status, Json(body)).into_response()
    }
}
