//! Handler for `subscription.updated` events.
//!
//! Cancellations arrive as updated snapshots with status `canceled`, so a
//! single handler covers the whole subscription lifecycle. Stale snapshots
//! are discarded by the ledger's timestamp-gated upsert.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::billing::{
    BillingEvent, BillingEventType, EventPayload, Reconciliation, ReconciliationHandler,
    SubscriptionSnapshot, WebhookError,
};
use crate::ports::AccountResolver;

pub struct SubscriptionSyncHandler {
    resolver: Arc<dyn AccountResolver>,
}

impl SubscriptionSyncHandler {
    pub fn new(resolver: Arc<dyn AccountResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ReconciliationHandler for SubscriptionSyncHandler {
    fn handles(&self) -> Vec<BillingEventType> {
        vec![BillingEventType::SubscriptionUpdated]
    }

    async fn handle(&self, event: &BillingEvent) -> Result<Reconciliation, WebhookError> {
        let payload = match event.typed_payload()? {
            EventPayload::Subscription(payload) => payload,
            _ => {
                return Err(WebhookError::ParseError(
                    "expected subscription payload".into(),
                ))
            }
        };

        let account_id = self
            .resolver
            .resolve(&payload.account_id)
            .await?
            .ok_or_else(|| WebhookError::UnresolvedAccount(payload.account_id.clone()))?;

        let snapshot =
            SubscriptionSnapshot::from_payload(account_id, &payload, event.occurred_at()?)?;

        Ok(Reconciliation::UpsertSubscription(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::StaticAccountResolver;
    use crate::domain::billing::SubscriptionStatus;
    use crate::domain::foundation::AccountId;
    use serde_json::json;

    fn handler() -> SubscriptionSyncHandler {
        let resolver = StaticAccountResolver::new()
            .with_account("cus_1", AccountId::new("acc_1").unwrap());
        SubscriptionSyncHandler::new(Arc::new(resolver))
    }

    fn update_event(status: &str, created: i64) -> BillingEvent {
        BillingEvent {
            id: "evt_1".to_string(),
            event_type: "subscription.updated".to_string(),
            created,
            payload: json!({
                "accountId": "cus_1",
                "providerSubscriptionId": "sub_9",
                "status": status,
                "collectionMethod": "send_invoice"
            }),
        }
    }

    #[tokio::test]
    async fn update_produces_snapshot_stamped_with_event_time() {
        let reconciliation = handler()
            .handle(&update_event("active", 1_704_067_200))
            .await
            .unwrap();

        match reconciliation {
            Reconciliation::UpsertSubscription(snapshot) => {
                assert_eq!(snapshot.account_id.as_str(), "acc_1");
                assert_eq!(snapshot.status, SubscriptionStatus::Active);
                assert_eq!(snapshot.snapshot_at.as_unix_secs(), 1_704_067_200);
            }
            other => panic!("expected upsert, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn cancellation_is_an_ordinary_snapshot() {
        let reconciliation = handler()
            .handle(&update_event("canceled", 1_704_067_300))
            .await
            .unwrap();

        match reconciliation {
            Reconciliation::UpsertSubscription(snapshot) => {
                assert_eq!(snapshot.status, SubscriptionStatus::Canceled);
            }
            other => panic!("expected upsert, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_account_is_unresolved() {
        let mut event = update_event("active", 1_704_067_200);
        event.payload["accountId"] = json!("cus_ghost");

        let result = handler().handle(&event).await;

        assert!(matches!(result, Err(WebhookError::UnresolvedAccount(_))));
    }
}
