//! Domain layer - core business types and the ingestion pipeline.

pub mod billing;
pub mod foundation;
