use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::inbound::http::router::AppState;
use crate::session::models::LoginCommand;
use crate::session::models::LoginSession;
use crate::session::ports::SessionServicePort;

pub async fn login<S: SessionServicePort>(
    State(state): State<AppState<S>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let Json(body) = payload?;

    state
        .session_service
        .login(LoginCommand::new(&body.email, body.password))
        .await
        .map_err(ApiError::from)
        .map(|ref session| ApiSuccess::new(StatusCode::OK, session.into()))
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub user: UserData,
    pub access_token: String,
    pub access_exp: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_exp: DateTime<Utc>,
}

impl From<&LoginSession> for LoginResponseData {
    fn from(session: &LoginSession) -> Self {
        Self {
            user: (&session.user).into(),
            access_token: session.access_token.token.clone(),
            access_exp: session.access_token.expires_at,
            refresh_token: session.refresh_token.token.clone(),
            refresh_exp: session.refresh_token.expires_at,
        }
    }
}
