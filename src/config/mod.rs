//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `BILLING_SYNC`
//! prefix and `__` as the nesting separator.
//!
//! # Example
//!
//! ```no_run
//! use billing_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod billing;
mod database;
mod error;
mod server;

pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Billing provider configuration (webhook secret)
    pub billing: BillingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `BILLING_SYNC__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `BILLING_SYNC__DATABASE__URL=...` -> `database.url = ...`
    /// - `BILLING_SYNC__BILLING__WEBHOOK_SECRET=whsec_...` -> `billing.webhook_secret = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BILLING_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.billing.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
