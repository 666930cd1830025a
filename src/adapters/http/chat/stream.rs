//! The streaming turn endpoint.
//!
//! `POST /api/chat/stream` checks the caller's daily quota, starts a turn
//! through the application handler, and re-frames the turn's events as
//! SSE: fragment events carry `0:"..."` / `1:"..."` data payloads and the
//! terminal event is named `message_complete`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::StreamExt;
use std::convert::Infallible;

use crate::adapters::http::dto::ErrorResponse;
use crate::adapters::http::middleware::RequestIdentity;
use crate::adapters::http::AppState;
use crate::application::{StreamTurnCommand, StreamTurnError, TurnEvent};
use crate::domain::foundation::Timestamp;
use crate::protocol::{encode_completion, encode_fragment, COMPLETE_EVENT};

use super::dto::StreamChatRequest;
use super::handlers::parse_chat_id;

/// Response header carrying the conversation id (useful when the turn
/// created the conversation).
pub const CHAT_ID_HEADER: &str = "x-chat-id";

/// POST /api/chat/stream - run one streaming chat turn.
pub async fn stream_chat(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Json(request): Json<StreamChatRequest>,
) -> Response {
    // Quota gate, read-only. The counter is incremented only once the
    // turn is accepted, so a rejected request costs nothing.
    let today = Timestamp::now().calendar_day();
    let count = match state.usage_store.current_count(&identity.0, today).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, "usage read failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("usage tracking unavailable")),
            )
                .into_response();
        }
    };
    if identity.0.quota_reached(count) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::too_many_requests(format!(
                "daily limit of {} messages reached",
                identity.0.daily_quota()
            ))),
        )
            .into_response();
    }

    let chat_id = match request.chat_id.as_deref() {
        Some(raw) => match parse_chat_id(raw) {
            Ok(id) => Some(id),
            Err(response) => return response,
        },
        None => None,
    };

    let command = StreamTurnCommand {
        user_id: identity.owner(),
        messages: request
            .messages
            .into_iter()
            .map(|m| m.into_prompt())
            .collect(),
        chat_id,
        model: request.model_id,
        temp_id: request.temp_id,
    };

    let turn = match state.turns.handle(command).await {
        Ok(turn) => turn,
        Err(e) => return handle_turn_error(e),
    };

    // The read above and this write are separate store calls; two turns
    // racing past the check at quota - 1 both run. The cap is a soft one.
    if let Err(e) = state.usage_store.increment(&identity.0, today).await {
        // The turn is already running; a lost increment only loosens the
        // soft cap further.
        tracing::error!(error = %e, "usage increment failed");
    }

    let conversation_id = turn.conversation_id.to_string();
    let events = turn.events.map(|event| {
        Ok::<Event, Infallible>(match event {
            TurnEvent::Fragment(chunk) => Event::default().data(encode_fragment(&chunk)),
            TurnEvent::Complete(completion) => match encode_completion(&completion) {
                Ok(json) => Event::default().event(COMPLETE_EVENT).data(json),
                Err(e) => {
                    // Should not happen for a plain struct; degrade to a
                    // close without the terminal event.
                    tracing::error!(error = %e, "completion serialization failed");
                    Event::default().comment("completion serialization failed")
                }
            },
        })
    });

    (
        [(CHAT_ID_HEADER, conversation_id)],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

fn handle_turn_error(error: StreamTurnError) -> Response {
    match error {
        StreamTurnError::NoUserMessage => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(
                "request must include at least one user message",
            )),
        )
            .into_response(),
        StreamTurnError::ConversationNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Conversation", &id.to_string())),
        )
            .into_response(),
        StreamTurnError::Store(message) => {
            tracing::error!(%message, "turn aborted before streaming");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("failed to start turn")),
            )
                .into_response()
        }
    }
}
