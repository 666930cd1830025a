//! PostgreSQL store implementations.
//!
//! Backed by an injected `sqlx::PgPool`; no global connection state. The
//! pool is created in `main` from `DatabaseConfig` and handed to each
//! adapter, which keeps tests free to construct adapters against
//! disposable databases.

mod chat_store;
mod usage_store;

pub use chat_store::PostgresChatStore;
pub use usage_store::PostgresUsageStore;

use crate::config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Builds a connection pool from the database configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await
}
