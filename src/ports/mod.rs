//! Ports - trait interfaces the application layer depends on.
//!
//! Adapters (postgres, memory) implement these traits.

mod account_resolver;
mod event_ledger;

pub use account_resolver::AccountResolver;
pub use event_ledger::{BeginOutcome, EventLedger, LedgerError, ProcessedEventRecord};
