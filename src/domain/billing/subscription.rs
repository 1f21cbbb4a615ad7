//! Local mirror of provider-owned subscription state.

use serde::{Deserialize, Serialize};

use super::reconciliation::SubscriptionSnapshot;
use crate::domain::foundation::{AccountId, SubscriptionId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "trialing" => Some(SubscriptionStatus::Trialing),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "unpaid" => Some(SubscriptionStatus::Unpaid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMethod {
    ChargeAutomatically,
    SendInvoice,
}

impl CollectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionMethod::ChargeAutomatically => "charge_automatically",
            CollectionMethod::SendInvoice => "send_invoice",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "charge_automatically" => Some(CollectionMethod::ChargeAutomatically),
            "send_invoice" => Some(CollectionMethod::SendInvoice),
            _ => None,
        }
    }
}

/// Mirrored subscription row. The provider is the source of truth; this
/// mirror is only ever written from event snapshots, newest snapshot wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub account_id: AccountId,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub collection_method: CollectionMethod,
    pub current_period_end: Option<Timestamp>,
    /// Provider-side time of the snapshot this row currently reflects.
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a mirror row from the first snapshot seen for a subscription.
    pub fn from_snapshot(snapshot: &SubscriptionSnapshot) -> Self {
        Self {
            id: SubscriptionId::new(),
            account_id: snapshot.account_id.clone(),
            provider_subscription_id: snapshot.provider_subscription_id.clone(),
            status: snapshot.status,
            collection_method: snapshot.collection_method,
            current_period_end: snapshot.current_period_end,
            updated_at: snapshot.snapshot_at,
        }
    }

    /// Applies a snapshot if it is not older than the one currently
    /// mirrored. Returns `false` when the snapshot was stale and discarded.
    pub fn apply_snapshot(&mut self, snapshot: &SubscriptionSnapshot) -> bool {
        if snapshot.snapshot_at.is_before(&self.updated_at) {
            return false;
        }
        self.status = snapshot.status;
        self.collection_method = snapshot.collection_method;
        self.current_period_end = snapshot.current_period_end;
        self.updated_at = snapshot.snapshot_at;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: SubscriptionStatus, at_secs: i64) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            account_id: AccountId::new("acc_1").unwrap(),
            provider_subscription_id: "sub_9".to_string(),
            status,
            collection_method: CollectionMethod::ChargeAutomatically,
            current_period_end: None,
            snapshot_at: Timestamp::from_unix_secs(at_secs).unwrap(),
        }
    }

    #[test]
    fn newer_snapshot_is_applied() {
        let mut sub = Subscription::from_snapshot(&snapshot(SubscriptionStatus::Active, 100));
        let applied = sub.apply_snapshot(&snapshot(SubscriptionStatus::Canceled, 200));
        assert!(applied);
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert_eq!(sub.updated_at.as_unix_secs(), 200);
    }

    #[test]
    fn stale_snapshot_is_discarded() {
        let mut sub = Subscription::from_snapshot(&snapshot(SubscriptionStatus::Active, 200));
        let applied = sub.apply_snapshot(&snapshot(SubscriptionStatus::Canceled, 100));
        assert!(!applied);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.updated_at.as_unix_secs(), 200);
    }

    #[test]
    fn equal_timestamp_snapshot_is_applied() {
        let mut sub = Subscription::from_snapshot(&snapshot(SubscriptionStatus::Active, 100));
        assert!(sub.apply_snapshot(&snapshot(SubscriptionStatus::PastDue, 100)));
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Unpaid,
        ] {
            assert_eq!(SubscriptionStatus::from_str(status.as_str()), Some(status));
        }
    }
}
