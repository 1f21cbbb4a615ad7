//! Billing provider configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Billing provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Webhook signing secret from the provider dashboard
    pub webhook_secret: String,
}

impl BillingConfig {
    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_WEBHOOK_SECRET"));
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }
        Ok(())
    }
}
