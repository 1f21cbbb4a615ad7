//! PostgreSQL implementation of AccountResolver.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::AccountResolver;

/// Resolves provider account references against the accounts table.
pub struct PostgresAccountResolver {
    pool: PgPool,
}

impl PostgresAccountResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountResolver for PostgresAccountResolver {
    async fn resolve(&self, provider_ref: &str) -> Result<Option<AccountId>, DomainError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT id FROM accounts WHERE provider_account_id = $1")
                .bind(provider_ref)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to resolve account: {}", e),
                    )
                })?;

        row.map(|(id,)| AccountId::new(id)).transpose()
    }
}
