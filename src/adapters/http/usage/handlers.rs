//! HTTP handlers for the usage endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::adapters::http::dto::ErrorResponse;
use crate::adapters::http::middleware::RequestIdentity;
use crate::adapters::http::AppState;
use crate::domain::foundation::Timestamp;
use crate::ports::UsageError;

/// Body of `GET /api/usage` and `POST /api/usage`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub count: u32,
    pub quota: u32,
    pub remaining: u32,
}

impl UsageResponse {
    fn new(count: u32, quota: u32) -> Self {
        Self {
            count,
            quota,
            remaining: quota.saturating_sub(count),
        }
    }
}

/// GET /api/usage - today's counter for the current identity.
pub async fn get_usage(State(state): State<AppState>, identity: RequestIdentity) -> Response {
    let today = Timestamp::now().calendar_day();
    match state.usage_store.current_count(&identity.0, today).await {
        Ok(count) => (
            StatusCode::OK,
            Json(UsageResponse::new(count, identity.0.daily_quota())),
        )
            .into_response(),
        Err(e) => handle_usage_error(e),
    }
}

/// POST /api/usage - increment today's counter, returning the new value.
pub async fn increment_usage(
    State(state): State<AppState>,
    identity: RequestIdentity,
) -> Response {
    let today = Timestamp::now().calendar_day();
    match state.usage_store.increment(&identity.0, today).await {
        Ok(count) => (
            StatusCode::OK,
            Json(UsageResponse::new(count, identity.0.daily_quota())),
        )
            .into_response(),
        Err(e) => handle_usage_error(e),
    }
}

fn handle_usage_error(error: UsageError) -> Response {
    tracing::error!(error = %error, "usage store error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal("usage tracking unavailable")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_saturates_at_zero() {
        let response = UsageResponse::new(12, 10);
        assert_eq!(response.remaining, 0);
    }

    #[test]
    fn response_serializes_camel_case() {
        let json = serde_json::to_string(&UsageResponse::new(3, 10)).unwrap();
        assert!(json.contains("\"count\":3"));
        assert!(json.contains("\"remaining\":7"));
    }
}
