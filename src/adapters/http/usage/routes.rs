//! Route table for the usage endpoints.

use axum::{routing::get, Router};

use crate::adapters::http::AppState;

use super::handlers::{get_usage, increment_usage};

/// Creates the usage router.
pub fn usage_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/usage", get(get_usage).post(increment_usage))
        .with_state(state)
}
