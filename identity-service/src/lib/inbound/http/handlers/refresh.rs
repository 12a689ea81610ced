use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;
use crate::session::models::RotatedSession;
use crate::session::ports::SessionServicePort;

pub async fn refresh<S: SessionServicePort>(
    State(state): State<AppState<S>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<ApiSuccess<RefreshResponseData>, ApiError> {
    let Json(body) = payload?;

    state
        .session_service
        .refresh(&body.refresh_token)
        .await
        .map_err(ApiError::from)
        .map(|ref rotated| ApiSuccess::new(StatusCode::OK, rotated.into()))
}

/// Body shared by refresh and logout
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshResponseData {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl From<&RotatedSession> for RefreshResponseData {
    fn from(rotated: &RotatedSession) -> Self {
        Self {
            access_token: rotated.access_token.token.clone(),
            refresh_token: rotated.refresh_token.token.clone(),
            expires_in: rotated.access_token.expires_in(),
        }
    }
}
