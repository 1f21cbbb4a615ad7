//! Handler for `checkout.completed` events.
//!
//! A completed checkout either grants credits or starts a subscription
//! (seat purchases arrive as subscription checkouts with a quantity).

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::billing::{
    BillingEvent, BillingEventType, CreditTopUp, EventPayload, PurchaseKind, Reconciliation,
    ReconciliationHandler, SubscriptionSnapshot, WebhookError,
};
use crate::domain::foundation::AccountId;
use crate::ports::AccountResolver;

pub struct CheckoutCompletedHandler {
    resolver: Arc<dyn AccountResolver>,
}

impl CheckoutCompletedHandler {
    pub fn new(resolver: Arc<dyn AccountResolver>) -> Self {
        Self { resolver }
    }

    async fn resolve_account(&self, provider_ref: &str) -> Result<AccountId, WebhookError> {
        self.resolver
            .resolve(provider_ref)
            .await?
            .ok_or_else(|| WebhookError::UnresolvedAccount(provider_ref.to_string()))
    }
}

#[async_trait]
impl ReconciliationHandler for CheckoutCompletedHandler {
    fn handles(&self) -> Vec<BillingEventType> {
        vec![BillingEventType::CheckoutCompleted]
    }

    async fn handle(&self, event: &BillingEvent) -> Result<Reconciliation, WebhookError> {
        let payload = match event.typed_payload()? {
            EventPayload::Checkout(payload) => payload,
            _ => return Err(WebhookError::ParseError("expected checkout payload".into())),
        };

        let account_id = self.resolve_account(&payload.account_id).await?;
        let occurred_at = event.occurred_at()?;

        match payload.kind {
            PurchaseKind::Credits => {
                let amount = payload.amount.ok_or(WebhookError::MissingField("amount"))?;
                if amount <= 0 {
                    return Err(WebhookError::ParseError(format!(
                        "credit purchase amount must be positive, got {}",
                        amount
                    )));
                }
                Ok(Reconciliation::TopUpCredits(CreditTopUp {
                    account_id,
                    amount,
                    granted_at: occurred_at,
                }))
            }
            PurchaseKind::Subscription | PurchaseKind::Seats => {
                let subscription = payload
                    .subscription
                    .as_ref()
                    .ok_or(WebhookError::MissingField("subscription"))?;
                let snapshot =
                    SubscriptionSnapshot::from_payload(account_id, subscription, occurred_at)?;
                Ok(Reconciliation::UpsertSubscription(snapshot))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::StaticAccountResolver;
    use crate::domain::billing::SubscriptionStatus;
    use serde_json::{json, Value};

    fn handler() -> CheckoutCompletedHandler {
        let resolver = StaticAccountResolver::new()
            .with_account("cus_1", AccountId::new("acc_1").unwrap());
        CheckoutCompletedHandler::new(Arc::new(resolver))
    }

    fn checkout_event(payload: Value) -> BillingEvent {
        BillingEvent {
            id: "evt_1".to_string(),
            event_type: "checkout.completed".to_string(),
            created: 1_704_067_200,
            payload,
        }
    }

    #[tokio::test]
    async fn credits_purchase_produces_top_up() {
        let event = checkout_event(json!({
            "accountId": "cus_1",
            "kind": "credits",
            "amount": 50
        }));

        let reconciliation = handler().handle(&event).await.unwrap();

        match reconciliation {
            Reconciliation::TopUpCredits(top_up) => {
                assert_eq!(top_up.account_id.as_str(), "acc_1");
                assert_eq!(top_up.amount, 50);
                assert_eq!(top_up.granted_at.as_unix_secs(), 1_704_067_200);
            }
            other => panic!("expected top-up, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn subscription_purchase_produces_upsert() {
        let event = checkout_event(json!({
            "accountId": "cus_1",
            "kind": "subscription",
            "subscription": {
                "accountId": "cus_1",
                "providerSubscriptionId": "sub_9",
                "status": "active",
                "currentPeriodEnd": 1_706_745_600i64
            }
        }));

        let reconciliation = handler().handle(&event).await.unwrap();

        match reconciliation {
            Reconciliation::UpsertSubscription(snapshot) => {
                assert_eq!(snapshot.provider_subscription_id, "sub_9");
                assert_eq!(snapshot.status, SubscriptionStatus::Active);
                assert_eq!(snapshot.snapshot_at.as_unix_secs(), 1_704_067_200);
            }
            other => panic!("expected upsert, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn credits_purchase_without_amount_fails() {
        let event = checkout_event(json!({"accountId": "cus_1", "kind": "credits"}));

        let result = handler().handle(&event).await;

        assert!(matches!(result, Err(WebhookError::MissingField("amount"))));
    }

    #[tokio::test]
    async fn credits_purchase_with_non_positive_amount_fails() {
        let event = checkout_event(json!({
            "accountId": "cus_1",
            "kind": "credits",
            "amount": 0
        }));

        let result = handler().handle(&event).await;

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[tokio::test]
    async fn subscription_purchase_without_snapshot_fails() {
        let event = checkout_event(json!({"accountId": "cus_1", "kind": "subscription"}));

        let result = handler().handle(&event).await;

        assert!(matches!(
            result,
            Err(WebhookError::MissingField("subscription"))
        ));
    }

    #[tokio::test]
    async fn unknown_provider_account_is_unresolved() {
        let event = checkout_event(json!({
            "accountId": "cus_ghost",
            "kind": "credits",
            "amount": 50
        }));

        let result = handler().handle(&event).await;

        assert!(matches!(result, Err(WebhookError::UnresolvedAccount(_))));
    }
}
