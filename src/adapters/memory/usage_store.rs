//! In-memory implementation of UsageStore for testing.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::chat::Identity;
use crate::ports::{UsageError, UsageStore};

/// In-memory daily usage counters keyed by (identity key, day).
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned. Acceptable for test
/// code; this adapter should not back a production deployment.
pub struct InMemoryUsageStore {
    counters: Mutex<HashMap<(String, NaiveDate), u32>>,
}

impl InMemoryUsageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-seeds a counter (test helper).
    pub fn seed(&self, identity: &Identity, day: NaiveDate, count: u32) {
        self.counters
            .lock()
            .expect("counters lock poisoned")
            .insert((identity.key(), day), count);
    }
}

impl Default for InMemoryUsageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn current_count(
        &self,
        identity: &Identity,
        day: NaiveDate,
    ) -> Result<u32, UsageError> {
        Ok(self
            .counters
            .lock()
            .expect("counters lock poisoned")
            .get(&(identity.key(), day))
            .copied()
            .unwrap_or(0))
    }

    async fn increment(&self, identity: &Identity, day: NaiveDate) -> Result<u32, UsageError> {
        let mut counters = self.counters.lock().expect("counters lock poisoned");
        let count = counters.entry((identity.key(), day)).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}
