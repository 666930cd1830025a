//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors raised by per-section `validate()` checks.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(&'static str),

    #[error("Database URL must start with postgres:// or postgresql://")]
    InvalidDatabaseUrl,

    #[error("Server port must be non-zero")]
    InvalidPort,

    #[error("Connection pool minimum exceeds maximum")]
    InvalidPoolSize,

    #[error("Default model string cannot be empty")]
    EmptyDefaultModel,
}
