//! Billing - webhook events, verification, and reconciliation.

mod credit_balance;
mod errors;
mod event;
mod pipeline;
mod reconciliation;
mod subscription;
mod verifier;

pub use credit_balance::CreditBalance;
pub use errors::WebhookError;
pub use event::{
    BillingEvent, BillingEventType, CheckoutPayload, CreditGrantPayload, EventPayload,
    PurchaseKind, SubscriptionPayload,
};
pub use pipeline::{IngestOutcome, ReconciliationHandler, WebhookDispatcher, WebhookPipeline};
pub use reconciliation::{CreditTopUp, Reconciliation, SubscriptionSnapshot};
pub use subscription::{CollectionMethod, Subscription, SubscriptionStatus};
pub use verifier::WebhookVerifier;
