//! Fixed-mapping account resolver.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, DomainError};
use crate::ports::AccountResolver;

/// Resolver backed by a fixed provider-ref to account-id map.
#[derive(Debug, Default)]
pub struct StaticAccountResolver {
    accounts: HashMap<String, AccountId>,
}

impl StaticAccountResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, provider_ref: impl Into<String>, account_id: AccountId) -> Self {
        self.accounts.insert(provider_ref.into(), account_id);
        self
    }
}

#[async_trait]
impl AccountResolver for StaticAccountResolver {
    async fn resolve(&self, provider_ref: &str) -> Result<Option<AccountId>, DomainError> {
        Ok(self.accounts.get(provider_ref).cloned())
    }
}
