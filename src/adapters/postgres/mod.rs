//! PostgreSQL adapters.

mod account_resolver;
mod event_ledger;

pub use account_resolver::PostgresAccountResolver;
pub use event_ledger::PostgresEventLedger;
