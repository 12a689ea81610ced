use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::refresh::RefreshRequest;
use super::ApiError;
use crate::inbound::http::router::AppState;
use crate::session::ports::SessionServicePort;

pub async fn logout<S: SessionServicePort>(
    State(state): State<AppState<S>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = payload?;

    state
        .session_service
        .logout(&body.refresh_token)
        .await
        .map_err(ApiError::from)
        .map(|_| StatusCode::NO_CONTENT)
}
