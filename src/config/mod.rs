//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `STANZA` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use stanza::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod providers;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use providers::ProvidersConfig;
pub use server::ServerConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, CORS)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Model provider configuration (keys, default model)
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads a `.env` file if present (development), then reads variables
    /// with the `STANZA` prefix:
    ///
    /// - `STANZA__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `STANZA__DATABASE__URL=...` -> `database.url = ...`
    /// - `STANZA__PROVIDERS__OPENAI_API_KEY=...` -> `providers.openai_api_key`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("STANZA")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Validate every configuration section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.providers.validate()?;
        Ok(())
    }
}
