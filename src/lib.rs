//! Billing Sync - Idempotent billing webhook ingestion and reconciliation.
//!
//! Receives billing-provider webhook deliveries, verifies their signatures,
//! deduplicates them through a durable event ledger, and reconciles internal
//! subscription and credit-balance state exactly once per event.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
