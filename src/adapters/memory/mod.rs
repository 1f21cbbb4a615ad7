//! In-memory adapters for tests and local development.

mod account_resolver;
mod event_ledger;

pub use account_resolver::StaticAccountResolver;
pub use event_ledger::InMemoryEventLedger;
