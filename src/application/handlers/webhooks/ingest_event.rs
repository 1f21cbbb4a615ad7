//! Entry point use case: verify a raw delivery and run it through the
//! pipeline.

use std::sync::Arc;

use crate::domain::billing::{IngestOutcome, WebhookError, WebhookPipeline, WebhookVerifier};

/// Raw webhook delivery as received over HTTP.
pub struct IngestWebhookCommand {
    pub payload: Vec<u8>,
    pub signature: Option<String>,
}

pub struct IngestWebhookHandler {
    verifier: Arc<WebhookVerifier>,
    pipeline: Arc<WebhookPipeline>,
}

impl IngestWebhookHandler {
    pub fn new(verifier: Arc<WebhookVerifier>, pipeline: Arc<WebhookPipeline>) -> Self {
        Self { verifier, pipeline }
    }

    /// Verifies the signature, parses the envelope, and processes the event.
    ///
    /// Verification happens before anything else; unverified bytes never
    /// reach the ledger or the handlers.
    pub async fn handle(
        &self,
        command: IngestWebhookCommand,
    ) -> Result<IngestOutcome, WebhookError> {
        let signature = command
            .signature
            .as_deref()
            .ok_or(WebhookError::MissingSignature)?;

        let event = self.verifier.verify_and_parse(&command.payload, signature)?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "webhook delivery verified"
        );

        self.pipeline.process(&event).await
    }
}
