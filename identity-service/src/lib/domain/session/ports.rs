use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::session::errors::SessionError;
use crate::session::models::LoginCommand;
use crate::session::models::LoginSession;
use crate::session::models::NewRefreshToken;
use crate::session::models::NewUser;
use crate::session::models::RefreshTokenId;
use crate::session::models::RefreshTokenRecord;
use crate::session::models::RegisterCommand;
use crate::session::models::Registration;
use crate::session::models::RotatedSession;
use crate::session::models::User;
use crate::session::models::UserId;

/// Port for session lifecycle operations.
#[async_trait]
pub trait SessionServicePort: Send + Sync + 'static {
    /// Create a user and log them in with an access token.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Hashing` / `TokenGeneration` / `DatabaseError` / `Timeout` - Infrastructure failure
    async fn register(&self, command: RegisterCommand) -> Result<Registration, SessionError>;

    /// Verify credentials and open a session with an access and a refresh token.
    ///
    /// # Errors
    /// * `InvalidInput` - Email or password is empty
    /// * `InvalidCredentials` - Unknown email or wrong password (indistinguishable)
    async fn login(&self, command: LoginCommand) -> Result<LoginSession, SessionError>;

    /// Exchange a refresh token for a new pair, revoking the presented one.
    ///
    /// # Errors
    /// * `InvalidRefreshToken` - No record matches, or its user is gone
    /// * `RefreshTokenExpiredOrRevoked` - Record is expired, already rotated, or
    ///   was rotated concurrently by another request
    async fn refresh(&self, refresh_token: &str) -> Result<RotatedSession, SessionError>;

    /// Revoke a single refresh token. Revoking twice is not an error.
    ///
    /// # Errors
    /// * `InvalidRefreshToken` - No record matches
    async fn logout(&self, refresh_token: &str) -> Result<(), SessionError>;

    /// Retrieve user by unique identifier.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    async fn get_user(&self, id: &UserId) -> Result<User, SessionError>;
}

/// Persistence operations for users.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user; the store assigns the identifier.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: NewUser) -> Result<User, SessionError>;

    /// Retrieve user by normalized email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, SessionError>;

    /// Retrieve user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, SessionError>;
}

/// Persistence operations for refresh tokens.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync + 'static {
    /// Persist a new refresh token record.
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, SessionError>;

    /// Retrieve a record by token digest, revoked or not.
    async fn find_by_digest(&self, digest: &str)
        -> Result<Option<RefreshTokenRecord>, SessionError>;

    /// Mark a record revoked. A record that is already revoked keeps its
    /// original revocation time.
    ///
    /// # Errors
    /// * `RefreshTokenNotFound` - No record with this id
    async fn revoke(
        &self,
        id: &RefreshTokenId,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), SessionError>;

    /// Revoke `id` and insert `replacement` as one atomic unit.
    ///
    /// The revoke only applies while `id` is still unrevoked; if another
    /// caller got there first nothing is written.
    ///
    /// # Errors
    /// * `RefreshTokenExpiredOrRevoked` - `id` was already revoked
    /// * `DatabaseError` - Either write failed; nothing was committed
    async fn rotate(
        &self,
        id: &RefreshTokenId,
        revoked_at: DateTime<Utc>,
        replacement: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, SessionError>;
}
