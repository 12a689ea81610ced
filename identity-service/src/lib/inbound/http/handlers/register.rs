use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::inbound::http::router::AppState;
use crate::session::errors::EmailError;
use crate::session::errors::PasswordPolicyError;
use crate::session::models::EmailAddress;
use crate::session::models::Password;
use crate::session::models::RegisterCommand;
use crate::session::models::Registration;
use crate::session::ports::SessionServicePort;

pub async fn register<S: SessionServicePort>(
    State(state): State<AppState<S>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiSuccess<RegisterResponseData>, ApiError> {
    let Json(body) = payload?;

    state
        .session_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref registration| ApiSuccess::new(StatusCode::CREATED, registration.into()))
}

/// HTTP request body for registering a user (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordPolicyError),
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, ParseRegisterRequestError> {
        let email = EmailAddress::new(self.email)?;
        let password = Password::new(self.password)?;
        Ok(RegisterCommand::new(email, password))
    }
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterResponseData {
    pub user: UserData,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&Registration> for RegisterResponseData {
    fn from(registration: &Registration) -> Self {
        Self {
            user: (&registration.user).into(),
            access_token: registration.access_token.token.clone(),
            expires_at: registration.access_token.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(request("a@x.com", "secret1").try_into_command().is_ok());
        assert!(matches!(
            request("a@x.com", "12345").try_into_command(),
            Err(ParseRegisterRequestError::Password(_))
        ));
        assert!(matches!(
            request("", "secret1").try_into_command(),
            Err(ParseRegisterRequestError::Email(EmailError::Empty))
        ));
        assert!(matches!(
            request("not-an-email", "secret1").try_into_command(),
            Err(ParseRegisterRequestError::Email(_))
        ));
    }
}
