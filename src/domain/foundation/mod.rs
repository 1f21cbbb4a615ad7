//! Foundation - shared value objects and error types.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use ids::{AccountId, SubscriptionId};
pub use timestamp::Timestamp;
