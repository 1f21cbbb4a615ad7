//! Prepaid credit balance per account.

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};

/// Credit balance for one account. Top-ups only; consumption is owned by
/// a different subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditBalance {
    pub account_id: AccountId,
    pub credits: i64,
    pub updated_at: Timestamp,
}

impl CreditBalance {
    /// Creates an empty balance for an account.
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            credits: 0,
            updated_at: Timestamp::now(),
        }
    }

    /// Adds credits to the balance. The amount must be positive.
    pub fn top_up(&mut self, amount: i64, at: Timestamp) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Top-up amount must be positive, got {}", amount),
            ));
        }
        self.credits += amount;
        self.updated_at = at;
        Ok(())
    }
}
