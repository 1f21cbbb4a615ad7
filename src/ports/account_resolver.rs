//! Resolution of provider account references to internal accounts.

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, DomainError};

/// Maps the provider's account reference (as carried in webhook payloads)
/// to an internal account id.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// Returns `Ok(None)` when no account matches the reference.
    async fn resolve(&self, provider_ref: &str) -> Result<Option<AccountId>, DomainError>;
}
