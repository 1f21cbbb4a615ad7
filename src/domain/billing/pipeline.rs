//! Idempotent webhook processing pipeline.
//!
//! Every delivery runs claim -> dispatch -> complete against the event
//! ledger. The claim is an insert-if-absent on the event id, so replays
//! and concurrent deliveries of the same event collapse to one processing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::errors::WebhookError;
use super::event::{BillingEvent, BillingEventType};
use super::reconciliation::Reconciliation;
use crate::ports::{BeginOutcome, EventLedger};

/// How many times a delivery waits out a concurrent in-flight processing
/// of the same event before giving up with a retryable error.
const IN_FLIGHT_RETRIES: u32 = 3;

/// Base backoff between in-flight retries; grows linearly per attempt.
const IN_FLIGHT_BACKOFF: Duration = Duration::from_millis(50);

/// Translates one event into its reconciliation outcome.
#[async_trait]
pub trait ReconciliationHandler: Send + Sync {
    /// Event types this handler is registered for.
    fn handles(&self) -> Vec<BillingEventType>;

    async fn handle(&self, event: &BillingEvent) -> Result<Reconciliation, WebhookError>;
}

/// Routes events to their registered handler.
#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    fn get_handler(&self, event_type: BillingEventType) -> Option<&dyn ReconciliationHandler>;

    /// Dispatches the event. Unhandled event types are acknowledged as a
    /// no-op so the provider can add types without breaking ingestion.
    async fn dispatch(&self, event: &BillingEvent) -> Result<Reconciliation, WebhookError> {
        match self.get_handler(event.parsed_type()) {
            Some(handler) => handler.handle(event).await,
            None => {
                tracing::debug!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "no handler registered, recording event without side effects"
                );
                Ok(Reconciliation::Skip)
            }
        }
    }
}

/// Result of ingesting one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The event was processed by this delivery.
    Processed,
    /// The event had already been processed; nothing was applied.
    AlreadyProcessed,
}

/// Drives verified events through the ledger exactly once.
pub struct WebhookPipeline {
    ledger: Arc<dyn EventLedger>,
    dispatcher: Arc<dyn WebhookDispatcher>,
    in_flight_retries: u32,
    in_flight_backoff: Duration,
}

impl WebhookPipeline {
    pub fn new(ledger: Arc<dyn EventLedger>, dispatcher: Arc<dyn WebhookDispatcher>) -> Self {
        Self {
            ledger,
            dispatcher,
            in_flight_retries: IN_FLIGHT_RETRIES,
            in_flight_backoff: IN_FLIGHT_BACKOFF,
        }
    }

    #[cfg(test)]
    fn with_retry_policy(mut self, retries: u32, backoff: Duration) -> Self {
        self.in_flight_retries = retries;
        self.in_flight_backoff = backoff;
        self
    }

    /// Processes one verified event.
    ///
    /// A delivery that loses the claim race waits briefly for the winner:
    /// if the winner completes, this delivery acknowledges; if it is still
    /// in flight after the retries are spent, the provider is asked to
    /// redeliver later.
    pub async fn process(&self, event: &BillingEvent) -> Result<IngestOutcome, WebhookError> {
        let mut attempt: u32 = 0;
        loop {
            match self.ledger.try_begin(event).await? {
                BeginOutcome::Accepted(_) => break,
                BeginOutcome::AlreadyProcessed => {
                    tracing::info!(event_id = %event.id, "duplicate delivery acknowledged");
                    return Ok(IngestOutcome::AlreadyProcessed);
                }
                BeginOutcome::AlreadyInFlight => {
                    attempt += 1;
                    if attempt > self.in_flight_retries {
                        tracing::warn!(
                            event_id = %event.id,
                            attempts = attempt,
                            "concurrent processing still in flight, requesting redelivery"
                        );
                        return Err(WebhookError::InFlight(event.id.clone()));
                    }
                    tokio::time::sleep(self.in_flight_backoff * attempt).await;
                }
            }
        }

        let reconciliation = match self.dispatcher.dispatch(event).await {
            Ok(reconciliation) => reconciliation,
            Err(WebhookError::UnresolvedAccount(provider_ref)) => {
                // Recorded as processed so the provider stops redelivering;
                // the alert is the operator's cue to backfill the account.
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    provider_ref = %provider_ref,
                    "webhook references an unknown account, manual follow-up required"
                );
                Reconciliation::Skip
            }
            // The ledger record stays in flight; a later redelivery will
            // reclaim it once it goes stale.
            Err(e) => return Err(e),
        };

        self.ledger.complete(&event.id, &reconciliation).await?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "webhook event processed"
        );
        Ok(IngestOutcome::Processed)
    }
}
