//! Usage Store Port - daily per-identity turn counters.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::chat::Identity;

/// Persistence port for daily usage counters.
///
/// Exactly one row exists per (identity, day). The increment is atomic at
/// the store level; the quota check against a previously read count is
/// deliberately not transactional with it (soft cap, see DESIGN.md).
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Current count for the identity on the given day (0 if no row).
    async fn current_count(&self, identity: &Identity, day: NaiveDate)
        -> Result<u32, UsageError>;

    /// Atomically upserts-and-increments the counter, returning the new
    /// count.
    async fn increment(&self, identity: &Identity, day: NaiveDate) -> Result<u32, UsageError>;
}

/// Usage store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UsageError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),
}

impl UsageError {
    /// Creates a database error from any displayable cause.
    pub fn database(cause: impl std::fmt::Display) -> Self {
        Self::Database(cause.to_string())
    }
}
