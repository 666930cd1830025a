//! Route table for the chat endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::http::AppState;

use super::handlers::{delete_chat, get_chat, list_chat_messages, list_chats, list_models, patch_chat};
use super::stream::stream_chat;

/// Creates the chat router.
pub fn chat_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat/stream", post(stream_chat))
        .route("/api/chats", get(list_chats))
        .route(
            "/api/chat/:id",
            get(get_chat).delete(delete_chat).patch(patch_chat),
        )
        .route("/api/chat/:id/messages", get(list_chat_messages))
        .route("/api/models", get(list_models))
        .with_state(state)
}
