//! Durable ledger of processed webhook events.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::billing::{BillingEvent, Reconciliation};
use crate::domain::foundation::Timestamp;

/// One row of the processed-event ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedEventRecord {
    /// Provider-assigned event id, unique across all deliveries.
    pub event_id: String,
    pub event_type: String,
    pub payload: Value,
    pub received_at: Timestamp,
    /// Set when the event's reconciliation has been applied. `None` marks
    /// an event that is currently in flight (or was abandoned by a crash).
    pub processed_at: Option<Timestamp>,
}

impl ProcessedEventRecord {
    /// Builds the record for a freshly received, not yet processed event.
    pub fn received(event: &BillingEvent) -> Self {
        Self {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            payload: event.payload.clone(),
            received_at: Timestamp::now(),
            processed_at: None,
        }
    }
}

/// Result of attempting to claim an event for processing.
#[derive(Debug, Clone, PartialEq)]
pub enum BeginOutcome {
    /// The event was unknown and this caller now owns it.
    Accepted(ProcessedEventRecord),
    /// The event was already fully processed; acknowledge without side effects.
    AlreadyProcessed,
    /// Another delivery of the same event is being processed right now.
    AlreadyInFlight,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Durable dedup ledger plus the atomic application of reconciliation
/// outcomes.
///
/// `complete` applies the event's state mutation and the processed marker
/// in a single transaction, so a crash can never leave the mutation applied
/// without the marker (or vice versa).
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Claims the event for processing. Insert-if-absent on the event id.
    async fn try_begin(&self, event: &BillingEvent) -> Result<BeginOutcome, LedgerError>;

    /// Marks the event processed and applies its reconciliation atomically.
    ///
    /// If a concurrent caller already completed the event, this is a no-op.
    async fn complete(
        &self,
        event_id: &str,
        reconciliation: &Reconciliation,
    ) -> Result<(), LedgerError>;

    /// Looks up a ledger record by event id.
    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEventRecord>, LedgerError>;
}
