//! Webhook processing error types.

use http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;
use crate::ports::LedgerError;

/// Errors that can occur while ingesting a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Webhook timestamp outside acceptable window")]
    TimestampOutOfRange,

    #[error("Invalid timestamp in signature header")]
    InvalidTimestamp,

    #[error("Failed to parse webhook payload: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("No account matches provider reference: {0}")]
    UnresolvedAccount(String),

    #[error("Event is being processed by another delivery: {0}")]
    InFlight(String),

    #[error("Event store error: {0}")]
    Store(String),
}

impl WebhookError {
    /// Whether the provider should retry the delivery.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::InFlight(_) | WebhookError::Store(_))
    }

    /// HTTP status the webhook endpoint responds with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::TimestampOutOfRange => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidTimestamp => StatusCode::BAD_REQUEST,
            WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,
            WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,
            // Acknowledged so the provider stops redelivering; the event is
            // recorded and flagged for operator follow-up.
            WebhookError::UnresolvedAccount(_) => StatusCode::OK,
            WebhookError::InFlight(_) => StatusCode::SERVICE_UNAVAILABLE,
            WebhookError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code for HTTP responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
            WebhookError::ParseError(_) => "MALFORMED_PAYLOAD",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::UnresolvedAccount(_) => "UNRESOLVED_ACCOUNT",
            WebhookError::InFlight(_) => "EVENT_IN_FLIGHT",
            WebhookError::Store(_) => "STORE_UNAVAILABLE",
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Store(err.to_string())
    }
}

impl From<LedgerError> for WebhookError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::StoreUnavailable(msg) => WebhookError::Store(msg),
        }
    }
}
