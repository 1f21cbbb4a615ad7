//! Webhook ingestion use cases.

mod checkout_completed;
mod credit_top_up;
mod dispatcher;
mod ingest_event;
mod subscription_sync;

pub use checkout_completed::CheckoutCompletedHandler;
pub use credit_top_up::CreditTopUpHandler;
pub use dispatcher::EventTypeDispatcher;
pub use ingest_event::{IngestWebhookCommand, IngestWebhookHandler};
pub use subscription_sync::SubscriptionSyncHandler;
