//! PostgreSQL implementation of UsageStore.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};

use crate::domain::chat::Identity;
use crate::ports::{UsageError, UsageStore};

/// PostgreSQL daily usage counters.
///
/// One row per (identity key, day), enforced by a unique constraint. The
/// increment is a single upsert so concurrent turns never lose counts.
#[derive(Clone)]
pub struct PostgresUsageStore {
    pool: PgPool,
}

impl PostgresUsageStore {
    /// Creates a new PostgresUsageStore over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageStore for PostgresUsageStore {
    async fn current_count(
        &self,
        identity: &Identity,
        day: NaiveDate,
    ) -> Result<u32, UsageError> {
        let row = sqlx::query(
            r#"
            SELECT count
            FROM usage_counters
            WHERE identity_key = $1 AND day = $2
            "#,
        )
        .bind(identity.key())
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UsageError::database(format!("Failed to fetch usage counter: {}", e)))?;

        Ok(row.map(|r| r.get::<i32, _>("count") as u32).unwrap_or(0))
    }

    async fn increment(&self, identity: &Identity, day: NaiveDate) -> Result<u32, UsageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO usage_counters (identity_key, day, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (identity_key, day)
            DO UPDATE SET count = usage_counters.count + 1
            RETURNING count
            "#,
        )
        .bind(identity.key())
        .bind(day)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| UsageError::database(format!("Failed to increment usage counter: {}", e)))?;

        Ok(row.get::<i32, _>("count") as u32)
    }
}
