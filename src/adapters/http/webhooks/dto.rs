//! Wire types for the webhook endpoint.

use serde::{Deserialize, Serialize};

/// Acknowledgement body returned to the provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

impl WebhookAckResponse {
    pub fn ok() -> Self {
        Self { received: true }
    }
}

/// Standard error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
