//! HTTP adapters - REST and SSE endpoint implementations.

pub mod chat;
pub mod dto;
pub mod middleware;
pub mod usage;

use std::sync::Arc;

use axum::Router;

use crate::application::StreamTurnHandler;
use crate::ports::{ChatStore, UsageStore};

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub chat_store: Arc<dyn ChatStore>,
    pub usage_store: Arc<dyn UsageStore>,
    pub turns: Arc<StreamTurnHandler>,
}

impl AppState {
    /// Creates the shared state.
    pub fn new(
        chat_store: Arc<dyn ChatStore>,
        usage_store: Arc<dyn UsageStore>,
        turns: Arc<StreamTurnHandler>,
    ) -> Self {
        Self {
            chat_store,
            usage_store,
            turns,
        }
    }
}

/// Creates the full API router.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(chat::chat_routes(state.clone()))
        .merge(usage::usage_routes(state))
}
