//! HTTP handlers for the chat CRUD endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::dto::ErrorResponse;
use crate::adapters::http::AppState;
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::StoreError;

use super::dto::{
    ChatResponse, ChatSummaryResponse, DeleteChatQuery, ListChatsQuery, MessageWithModelResponse,
    ModelResponse, PatchChatRequest,
};

/// GET /api/chats - list a user's conversations with previews.
pub async fn list_chats(
    State(state): State<AppState>,
    Query(query): Query<ListChatsQuery>,
) -> Response {
    let user_id = match query.user_id.and_then(|v| UserId::new(v).ok()) {
        Some(id) => id,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("userId query parameter is required")),
            )
                .into_response()
        }
    };

    match state
        .chat_store
        .list_conversations(&user_id, query.include_deleted)
        .await
    {
        Ok(summaries) => {
            let body: Vec<ChatSummaryResponse> =
                summaries.iter().map(ChatSummaryResponse::from).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => handle_store_error(e),
    }
}

/// GET /api/chat/:id - fetch one conversation, soft-deleted included.
pub async fn get_chat(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_chat_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.chat_store.get_conversation(id).await {
        Ok(Some(conversation)) => {
            (StatusCode::OK, Json(ChatResponse::from(&conversation))).into_response()
        }
        Ok(None) => not_found(id),
        Err(e) => handle_store_error(e),
    }
}

/// DELETE /api/chat/:id - soft delete, or permanent with `?hard=true`.
pub async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteChatQuery>,
) -> Response {
    let id = match parse_chat_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let result = if query.hard {
        state.chat_store.hard_delete_conversation(id).await
    } else {
        state.chat_store.soft_delete_conversation(id).await
    };

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => handle_store_error(e),
    }
}

/// PATCH /api/chat/:id - currently only `{"action":"restore"}`.
pub async fn patch_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PatchChatRequest>,
) -> Response {
    let id = match parse_chat_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    if request.action != "restore" {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(format!(
                "unsupported action: {}",
                request.action
            ))),
        )
            .into_response();
    }

    match state.chat_store.restore_conversation(id).await {
        Ok(()) => match state.chat_store.get_conversation(id).await {
            Ok(Some(conversation)) => {
                (StatusCode::OK, Json(ChatResponse::from(&conversation))).into_response()
            }
            Ok(None) => not_found(id),
            Err(e) => handle_store_error(e),
        },
        Err(e) => handle_store_error(e),
    }
}

/// GET /api/chat/:id/messages - ordered messages with model descriptors.
pub async fn list_chat_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_chat_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    // Distinguish an empty conversation from a missing one.
    match state.chat_store.get_conversation(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(id),
        Err(e) => return handle_store_error(e),
    }

    match state.chat_store.list_messages(id).await {
        Ok(messages) => {
            let body: Vec<MessageWithModelResponse> =
                messages.iter().map(MessageWithModelResponse::from).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => handle_store_error(e),
    }
}

/// GET /api/models - active model descriptors for the selector.
pub async fn list_models(State(state): State<AppState>) -> Response {
    match state.chat_store.list_active_models().await {
        Ok(models) => {
            let body: Vec<ModelResponse> = models.iter().map(ModelResponse::from).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => handle_store_error(e),
    }
}

// === Helpers ===

pub(super) fn parse_chat_id(raw: &str) -> Result<ConversationId, Response> {
    raw.parse::<ConversationId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid conversation ID")),
        )
            .into_response()
    })
}

pub(super) fn not_found(id: ConversationId) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::not_found("Conversation", &id.to_string())),
    )
        .into_response()
}

pub(super) fn handle_store_error(error: StoreError) -> Response {
    match error {
        StoreError::ConversationNotFound(id) => not_found(id),
        StoreError::Database(message) => {
            tracing::error!(%message, "store error while serving request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("storage unavailable")),
            )
                .into_response()
        }
    }
}
