//! Billing provider webhook event envelope and typed payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::WebhookError;
use super::subscription::{CollectionMethod, SubscriptionStatus};
use crate::domain::foundation::Timestamp;

/// Raw webhook event as delivered by the billing provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Unix seconds at which the event occurred at the provider.
    pub created: i64,
    /// Type-specific payload, kept raw until dispatch.
    pub payload: Value,
}

impl BillingEvent {
    /// Returns the parsed event type, `Unknown` for unrecognized strings.
    pub fn parsed_type(&self) -> BillingEventType {
        BillingEventType::from_str(&self.event_type)
    }

    /// Provider-side occurrence time of the event.
    pub fn occurred_at(&self) -> Result<Timestamp, WebhookError> {
        Timestamp::from_unix_secs(self.created).ok_or_else(|| {
            WebhookError::ParseError(format!("event created out of range: {}", self.created))
        })
    }

    /// Deserializes the payload according to the event type.
    pub fn typed_payload(&self) -> Result<EventPayload, WebhookError> {
        let payload = match self.parsed_type() {
            BillingEventType::CheckoutCompleted => {
                EventPayload::Checkout(self.parse_payload::<CheckoutPayload>()?)
            }
            BillingEventType::SubscriptionUpdated => {
                EventPayload::Subscription(self.parse_payload::<SubscriptionPayload>()?)
            }
            BillingEventType::CreditsGranted => {
                EventPayload::CreditGrant(self.parse_payload::<CreditGrantPayload>()?)
            }
            BillingEventType::Unknown => EventPayload::Unknown(self.payload.clone()),
        };
        Ok(payload)
    }

    fn parse_payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| WebhookError::ParseError(format!("{}: {}", self.event_type, e)))
    }
}

/// Event types this subsystem reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillingEventType {
    CheckoutCompleted,
    SubscriptionUpdated,
    CreditsGranted,
    Unknown,
}

impl BillingEventType {
    pub fn from_str(s: &str) -> Self {
        match s {
            "checkout.completed" => BillingEventType::CheckoutCompleted,
            "subscription.updated" => BillingEventType::SubscriptionUpdated,
            "credits.granted" => BillingEventType::CreditsGranted,
            _ => BillingEventType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingEventType::CheckoutCompleted => "checkout.completed",
            BillingEventType::SubscriptionUpdated => "subscription.updated",
            BillingEventType::CreditsGranted => "credits.granted",
            BillingEventType::Unknown => "unknown",
        }
    }
}

/// Payload deserialized according to the event type.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Checkout(CheckoutPayload),
    Subscription(SubscriptionPayload),
    CreditGrant(CreditGrantPayload),
    Unknown(Value),
}

/// What a completed checkout purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseKind {
    Credits,
    Subscription,
    Seats,
}

/// Payload of a `checkout.completed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    /// Provider's reference to the purchasing account.
    pub account_id: String,
    pub kind: PurchaseKind,
    /// Credit amount for `kind: credits` purchases.
    pub amount: Option<i64>,
    pub quantity: Option<u32>,
    /// Present for subscription and seat purchases.
    pub subscription: Option<SubscriptionPayload>,
}

/// Subscription snapshot carried in `subscription.updated` events and in
/// subscription checkouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPayload {
    pub account_id: String,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub collection_method: Option<CollectionMethod>,
    /// Unix seconds; absent for subscriptions without a fixed period.
    pub current_period_end: Option<i64>,
}

/// Payload of a `credits.granted` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditGrantPayload {
    pub account_id: String,
    pub amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, payload: Value) -> BillingEvent {
        BillingEvent {
            id: "evt_test_1".to_string(),
            event_type: event_type.to_string(),
            created: 1_704_067_200,
            payload,
        }
    }

    #[test]
    fn parses_known_event_types() {
        assert_eq!(
            BillingEventType::from_str("checkout.completed"),
            BillingEventType::CheckoutCompleted
        );
        assert_eq!(
            BillingEventType::from_str("subscription.updated"),
            BillingEventType::SubscriptionUpdated
        );
        assert_eq!(
            BillingEventType::from_str("credits.granted"),
            BillingEventType::CreditsGranted
        );
    }

    #[test]
    fn unrecognized_event_type_is_unknown() {
        assert_eq!(
            BillingEventType::from_str("invoice.finalized"),
            BillingEventType::Unknown
        );
    }

    #[test]
    fn deserializes_credits_checkout_payload() {
        let evt = event(
            "checkout.completed",
            json!({"accountId": "cus_1", "kind": "credits", "amount": 50}),
        );
        match evt.typed_payload().unwrap() {
            EventPayload::Checkout(p) => {
                assert_eq!(p.account_id, "cus_1");
                assert_eq!(p.kind, PurchaseKind::Credits);
                assert_eq!(p.amount, Some(50));
                assert!(p.subscription.is_none());
            }
            other => panic!("expected checkout payload, got {:?}", other),
        }
    }

    #[test]
    fn deserializes_subscription_payload() {
        let evt = event(
            "subscription.updated",
            json!({
                "accountId": "cus_1",
                "providerSubscriptionId": "sub_9",
                "status": "active",
                "collectionMethod": "charge_automatically",
                "currentPeriodEnd": 1_706_745_600i64
            }),
        );
        match evt.typed_payload().unwrap() {
            EventPayload::Subscription(p) => {
                assert_eq!(p.provider_subscription_id, "sub_9");
                assert_eq!(p.status, SubscriptionStatus::Active);
                assert_eq!(p.current_period_end, Some(1_706_745_600));
            }
            other => panic!("expected subscription payload, got {:?}", other),
        }
    }

    #[test]
    fn malformed_payload_is_a_parse_error() {
        let evt = event("credits.granted", json!({"accountId": "cus_1"}));
        assert!(matches!(
            evt.typed_payload(),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[test]
    fn unknown_event_payload_stays_raw() {
        let evt = event("invoice.finalized", json!({"whatever": true}));
        assert!(matches!(
            evt.typed_payload().unwrap(),
            EventPayload::Unknown(_)
        ));
    }

    #[test]
    fn occurred_at_rejects_out_of_range_created() {
        let mut evt = event("credits.granted", json!({}));
        evt.created = i64::MAX;
        assert!(evt.occurred_at().is_err());
    }
}
