//! In-memory store implementations for tests and local development.
//!
//! These adapters hold everything behind `std::sync` locks and deliver
//! deterministic results, which makes relay and API tests independent of
//! a running PostgreSQL instance. They are not meant for production use.

mod chat_store;
mod usage_store;

pub use chat_store::InMemoryChatStore;
pub use usage_store::InMemoryUsageStore;
