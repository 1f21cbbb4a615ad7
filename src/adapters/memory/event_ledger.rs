//! In-memory event ledger mirroring the Postgres semantics.
//!
//! Used by tests and local development. Claims, stale reclaim, and the
//! claim-first completion behave exactly as the Postgres adapter so
//! integration tests exercise the real pipeline semantics.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{
    BillingEvent, CreditBalance, Reconciliation, Subscription,
};
use crate::domain::foundation::{AccountId, Timestamp};
use crate::ports::{BeginOutcome, EventLedger, LedgerError, ProcessedEventRecord};

/// In-flight records older than this are assumed abandoned by a crashed
/// worker and may be reclaimed by a redelivery.
const STALE_IN_FLIGHT_SECS: i64 = 120;

type SubscriptionKey = (AccountId, String);

#[derive(Default)]
struct LedgerState {
    records: HashMap<String, ProcessedEventRecord>,
    subscriptions: HashMap<SubscriptionKey, Subscription>,
    balances: HashMap<AccountId, CreditBalance>,
}

#[derive(Default)]
pub struct InMemoryEventLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryEventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mirrored subscription for an account, if any.
    pub async fn subscription(
        &self,
        account_id: &AccountId,
        provider_subscription_id: &str,
    ) -> Option<Subscription> {
        let state = self.state.read().await;
        state
            .subscriptions
            .get(&(account_id.clone(), provider_subscription_id.to_string()))
            .cloned()
    }

    /// Returns the credit balance for an account; zero if never topped up.
    pub async fn credits(&self, account_id: &AccountId) -> i64 {
        let state = self.state.read().await;
        state
            .balances
            .get(account_id)
            .map(|b| b.credits)
            .unwrap_or(0)
    }

    /// Returns the ledger record for an event id.
    pub async fn record(&self, event_id: &str) -> Option<ProcessedEventRecord> {
        let state = self.state.read().await;
        state.records.get(event_id).cloned()
    }

    fn apply(state: &mut LedgerState, reconciliation: &Reconciliation, now: Timestamp) {
        match reconciliation {
            Reconciliation::UpsertSubscription(snapshot) => {
                let key = (
                    snapshot.account_id.clone(),
                    snapshot.provider_subscription_id.clone(),
                );
                match state.subscriptions.get_mut(&key) {
                    Some(existing) => {
                        existing.apply_snapshot(snapshot);
                    }
                    None => {
                        state
                            .subscriptions
                            .insert(key, Subscription::from_snapshot(snapshot));
                    }
                }
            }
            Reconciliation::TopUpCredits(top_up) => {
                let balance = state
                    .balances
                    .entry(top_up.account_id.clone())
                    .or_insert_with(|| CreditBalance::new(top_up.account_id.clone()));
                // Amount was validated by the handler.
                balance.credits += top_up.amount;
                balance.updated_at = now;
            }
            Reconciliation::Skip => {}
        }
    }
}

#[async_trait]
impl EventLedger for InMemoryEventLedger {
    async fn try_begin(&self, event: &BillingEvent) -> Result<BeginOutcome, LedgerError> {
        let mut state = self.state.write().await;
        let now = Timestamp::now();

        match state.records.get_mut(&event.id) {
            None => {
                let record = ProcessedEventRecord::received(event);
                state.records.insert(event.id.clone(), record.clone());
                Ok(BeginOutcome::Accepted(record))
            }
            Some(record) => {
                if record.processed_at.is_some() {
                    return Ok(BeginOutcome::AlreadyProcessed);
                }
                if record.received_at.is_before(&now.minus_secs(STALE_IN_FLIGHT_SECS)) {
                    record.received_at = now;
                    return Ok(BeginOutcome::Accepted(record.clone()));
                }
                Ok(BeginOutcome::AlreadyInFlight)
            }
        }
    }

    async fn complete(
        &self,
        event_id: &str,
        reconciliation: &Reconciliation,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        let now = Timestamp::now();

        // Claim the processed marker first; if another delivery already
        // completed the event, the mutation must not be applied again.
        match state.records.get_mut(event_id) {
            Some(record) if record.processed_at.is_none() => {
                record.processed_at = Some(now);
            }
            _ => return Ok(()),
        }

        Self::apply(&mut state, reconciliation, now);
        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEventRecord>, LedgerError> {
        let state = self.state.read().await;
        Ok(state.records.get(event_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{
        CollectionMethod, CreditTopUp, SubscriptionSnapshot, SubscriptionStatus,
    };
    use serde_json::json;

    fn event(id: &str) -> BillingEvent {
        BillingEvent {
            id: id.to_string(),
            event_type: "credits.granted".to_string(),
            created: 1_704_067_200,
            payload: json!({"accountId": "cus_1", "amount": 50}),
        }
    }

    fn account() -> AccountId {
        AccountId::new("acc_1").unwrap()
    }

    fn top_up(amount: i64) -> Reconciliation {
        Reconciliation::TopUpCredits(CreditTopUp {
            account_id: account(),
            amount,
            granted_at: Timestamp::from_unix_secs(1_704_067_200).unwrap(),
        })
    }

    fn snapshot(status: SubscriptionStatus, at_secs: i64) -> Reconciliation {
        Reconciliation::UpsertSubscription(SubscriptionSnapshot {
            account_id: account(),
            provider_subscription_id: "sub_9".to_string(),
            status,
            collection_method: CollectionMethod::ChargeAutomatically,
            current_period_end: None,
            snapshot_at: Timestamp::from_unix_secs(at_secs).unwrap(),
        })
    }

    #[tokio::test]
    async fn first_begin_accepts_subsequent_begins_report_in_flight() {
        let ledger = InMemoryEventLedger::new();
        let evt = event("evt_1");

        assert!(matches!(
            ledger.try_begin(&evt).await.unwrap(),
            BeginOutcome::Accepted(_)
        ));
        assert!(matches!(
            ledger.try_begin(&evt).await.unwrap(),
            BeginOutcome::AlreadyInFlight
        ));
    }

    #[tokio::test]
    async fn completed_event_reports_already_processed() {
        let ledger = InMemoryEventLedger::new();
        let evt = event("evt_1");

        ledger.try_begin(&evt).await.unwrap();
        ledger.complete(&evt.id, &top_up(50)).await.unwrap();

        assert!(matches!(
            ledger.try_begin(&evt).await.unwrap(),
            BeginOutcome::AlreadyProcessed
        ));
        assert_eq!(ledger.credits(&account()).await, 50);
    }

    #[tokio::test]
    async fn second_complete_is_a_no_op() {
        let ledger = InMemoryEventLedger::new();
        let evt = event("evt_1");

        ledger.try_begin(&evt).await.unwrap();
        ledger.complete(&evt.id, &top_up(50)).await.unwrap();
        ledger.complete(&evt.id, &top_up(50)).await.unwrap();

        assert_eq!(ledger.credits(&account()).await, 50);
    }

    #[tokio::test]
    async fn stale_snapshot_does_not_overwrite_newer_state() {
        let ledger = InMemoryEventLedger::new();

        let newer = event("evt_2");
        ledger.try_begin(&newer).await.unwrap();
        ledger
            .complete(&newer.id, &snapshot(SubscriptionStatus::Active, 200))
            .await
            .unwrap();

        let older = event("evt_3");
        ledger.try_begin(&older).await.unwrap();
        ledger
            .complete(&older.id, &snapshot(SubscriptionStatus::Canceled, 100))
            .await
            .unwrap();

        let sub = ledger.subscription(&account(), "sub_9").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);

        // Both events are still recorded as processed.
        assert!(ledger.record("evt_2").await.unwrap().processed_at.is_some());
        assert!(ledger.record("evt_3").await.unwrap().processed_at.is_some());
    }

    #[tokio::test]
    async fn stale_in_flight_record_is_reclaimed() {
        let ledger = InMemoryEventLedger::new();
        let evt = event("evt_1");

        ledger.try_begin(&evt).await.unwrap();
        {
            let mut state = ledger.state.write().await;
            let record = state.records.get_mut("evt_1").unwrap();
            record.received_at = Timestamp::now().minus_secs(STALE_IN_FLIGHT_SECS + 1);
        }

        assert!(matches!(
            ledger.try_begin(&evt).await.unwrap(),
            BeginOutcome::Accepted(_)
        ));
    }
}
