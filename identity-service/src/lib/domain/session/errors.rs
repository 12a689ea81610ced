use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid user id: {0}")]
    InvalidFormat(String),
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Email is required")]
    Empty,

    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for password policy violations at registration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },
}

/// Top-level error for all session lifecycle operations
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    // Value object validation errors (automatically converted via #[from])
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid password: {0}")]
    InvalidPassword(#[from] PasswordPolicyError),

    #[error("{0}")]
    InvalidInput(String),

    // Domain-level errors
    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidRefreshToken,

    #[error("Token expired or revoked")]
    RefreshTokenExpiredOrRevoked,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Refresh token not found: {0}")]
    RefreshTokenNotFound(String),

    // Infrastructure errors
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Store deadline exceeded during {0}")]
    Timeout(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<auth::PasswordError> for SessionError {
    fn from(err: auth::PasswordError) -> Self {
        SessionError::Hashing(err.to_string())
    }
}

impl From<auth::TokenError> for SessionError {
    fn from(err: auth::TokenError) -> Self {
        SessionError::TokenGeneration(err.to_string())
    }
}

impl From<auth::RefreshTokenError> for SessionError {
    fn from(err: auth::RefreshTokenError) -> Self {
        SessionError::TokenGeneration(err.to_string())
    }
}
