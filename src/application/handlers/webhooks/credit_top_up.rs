//! Handler for `credits.granted` events.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::billing::{
    BillingEvent, BillingEventType, CreditTopUp, EventPayload, Reconciliation,
    ReconciliationHandler, WebhookError,
};
use crate::ports::AccountResolver;

pub struct CreditTopUpHandler {
    resolver: Arc<dyn AccountResolver>,
}

impl CreditTopUpHandler {
    pub fn new(resolver: Arc<dyn AccountResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ReconciliationHandler for CreditTopUpHandler {
    fn handles(&self) -> Vec<BillingEventType> {
        vec![BillingEventType::CreditsGranted]
    }

    async fn handle(&self, event: &BillingEvent) -> Result<Reconciliation, WebhookError> {
        let payload = match event.typed_payload()? {
            EventPayload::CreditGrant(payload) => payload,
            _ => {
                return Err(WebhookError::ParseError(
                    "expected credit grant payload".into(),
                ))
            }
        };

        if payload.amount <= 0 {
            return Err(WebhookError::ParseError(format!(
                "credit grant amount must be positive, got {}",
                payload.amount
            )));
        }

        let account_id = self
            .resolver
            .resolve(&payload.account_id)
            .await?
            .ok_or_else(|| WebhookError::UnresolvedAccount(payload.account_id.clone()))?;

        Ok(Reconciliation::TopUpCredits(CreditTopUp {
            account_id,
            amount: payload.amount,
            granted_at: event.occurred_at()?,
        }))
    }
}
