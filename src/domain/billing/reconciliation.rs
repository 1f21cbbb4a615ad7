//! Reconciliation outcomes produced by event handlers.
//!
//! Handlers never touch storage directly. They translate an event into a
//! `Reconciliation`, and the ledger applies it together with the processed
//! marker in one transaction.

use super::errors::WebhookError;
use super::event::SubscriptionPayload;
use super::subscription::{CollectionMethod, SubscriptionStatus};
use crate::domain::foundation::{AccountId, Timestamp};

/// State mutation an event resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    UpsertSubscription(SubscriptionSnapshot),
    TopUpCredits(CreditTopUp),
    /// The event requires no local state change; record it as processed.
    Skip,
}

/// Point-in-time view of a provider subscription, ready to mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionSnapshot {
    pub account_id: AccountId,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub collection_method: CollectionMethod,
    pub current_period_end: Option<Timestamp>,
    /// Provider-side event time; orders competing snapshots.
    pub snapshot_at: Timestamp,
}

impl SubscriptionSnapshot {
    /// Builds a snapshot from a webhook payload with the account already
    /// resolved to an internal id.
    pub fn from_payload(
        account_id: AccountId,
        payload: &SubscriptionPayload,
        snapshot_at: Timestamp,
    ) -> Result<Self, WebhookError> {
        let current_period_end = match payload.current_period_end {
            Some(secs) => Some(Timestamp::from_unix_secs(secs).ok_or_else(|| {
                WebhookError::ParseError(format!("currentPeriodEnd out of range: {}", secs))
            })?),
            None => None,
        };
        Ok(Self {
            account_id,
            provider_subscription_id: payload.provider_subscription_id.clone(),
            status: payload.status,
            collection_method: payload
                .collection_method
                .unwrap_or(CollectionMethod::ChargeAutomatically),
            current_period_end,
            snapshot_at,
        })
    }
}

/// Credit grant ready to apply to an account's balance.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditTopUp {
    pub account_id: AccountId,
    pub amount: i64,
    pub granted_at: Timestamp,
}
