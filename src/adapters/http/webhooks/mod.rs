//! Webhook HTTP endpoint.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, WebhookAckResponse};
pub use handlers::{WebhookAppState, SIGNATURE_HEADER};
pub use routes::webhook_router;
