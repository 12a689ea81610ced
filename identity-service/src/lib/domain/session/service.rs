use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;
use auth::IssuedAccessToken;
use chrono::DateTime;
use chrono::Utc;
use tokio::time::Instant;

use crate::session::errors::SessionError;
use crate::session::models::IssuedRefreshToken;
use crate::session::models::LoginCommand;
use crate::session::models::LoginSession;
use crate::session::models::NewRefreshToken;
use crate::session::models::NewUser;
use crate::session::models::Password;
use crate::session::models::RegisterCommand;
use crate::session::models::Registration;
use crate::session::models::RotatedSession;
use crate::session::models::User;
use crate::session::models::UserId;
use crate::session::ports::RefreshTokenRepository;
use crate::session::ports::SessionServicePort;
use crate::session::ports::UserRepository;

/// Default store budget for one request, shared by all of its store calls.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(3);

/// Domain service implementation for the session lifecycle.
///
/// Concrete implementation of SessionServicePort with dependency injection.
pub struct SessionService<UR, TR>
where
    UR: UserRepository,
    TR: RefreshTokenRepository,
{
    users: Arc<UR>,
    refresh_tokens: Arc<TR>,
    authenticator: Arc<Authenticator>,
    store_timeout: Duration,
}

impl<UR, TR> SessionService<UR, TR>
where
    UR: UserRepository,
    TR: RefreshTokenRepository,
{
    /// Create a new session service with injected dependencies.
    ///
    /// # Arguments
    /// * `users` - User persistence implementation
    /// * `refresh_tokens` - Refresh token persistence implementation
    /// * `authenticator` - Shared hasher, token codec and refresh token factory
    pub fn new(
        users: Arc<UR>,
        refresh_tokens: Arc<TR>,
        authenticator: Arc<Authenticator>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            authenticator,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Start the store deadline for one request.
    fn deadline(&self) -> Instant {
        Instant::now() + self.store_timeout
    }

    async fn within_deadline<T, F>(
        &self,
        deadline: Instant,
        operation: &'static str,
        future: F,
    ) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, SessionError>> + Send,
    {
        match tokio::time::timeout_at(deadline, future).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    operation,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Store deadline exceeded"
                );
                Err(SessionError::Timeout(operation.to_string()))
            }
        }
    }

    /// Hashing is deliberately slow, so it runs on the blocking pool.
    async fn hash_password(&self, password: Password) -> Result<String, SessionError> {
        let authenticator = Arc::clone(&self.authenticator);

        tokio::task::spawn_blocking(move || authenticator.hash_password(password.as_str()))
            .await
            .map_err(|e| SessionError::Unknown(format!("Password hashing task failed: {}", e)))?
            .map_err(SessionError::from)
    }

    async fn authenticate(&self, user: &User, password: String) -> Result<IssuedAccessToken, SessionError> {
        let authenticator = Arc::clone(&self.authenticator);
        let stored_hash = user.password_hash.clone();
        let user_id = user.id;
        let email = user.email.as_str().to_string();

        tokio::task::spawn_blocking(move || {
            authenticator.authenticate(&password, &stored_hash, user_id, &email)
        })
        .await
        .map_err(|e| SessionError::Unknown(format!("Password verification task failed: {}", e)))?
        .map_err(|e| match e {
            AuthenticationError::InvalidCredentials => SessionError::InvalidCredentials,
            AuthenticationError::PasswordError(err) => SessionError::from(err),
            AuthenticationError::TokenError(err) => SessionError::from(err),
        })
    }

    /// Unknown accounts still pay for one password verification.
    async fn reject_unknown_email(&self, password: String) -> Result<(), SessionError> {
        let authenticator = Arc::clone(&self.authenticator);

        tokio::task::spawn_blocking(move || authenticator.verify_placeholder(&password))
            .await
            .map_err(|e| SessionError::Unknown(format!("Password verification task failed: {}", e)))?;

        Ok(())
    }

    fn new_refresh_token(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(NewRefreshToken, IssuedRefreshToken), SessionError> {
        let generated = self.authenticator.generate_refresh_token()?;

        let record = NewRefreshToken {
            user_id,
            token_digest: generated.digest,
            expires_at: generated.expires_at,
            created_at: now,
        };
        let issued = IssuedRefreshToken {
            token: generated.plaintext,
            expires_at: generated.expires_at,
        };

        Ok((record, issued))
    }
}

#[async_trait]
impl<UR, TR> SessionServicePort for SessionService<UR, TR>
where
    UR: UserRepository,
    TR: RefreshTokenRepository,
{
    async fn register(&self, command: RegisterCommand) -> Result<Registration, SessionError> {
        let deadline = self.deadline();
        let password_hash = self.hash_password(command.password).await?;

        let new_user = NewUser {
            email: command.email,
            password_hash,
        };
        let user = self
            .within_deadline(deadline, "create_user", self.users.create(new_user))
            .await?;

        let access_token = self
            .authenticator
            .issue_access_token(user.id, user.email.as_str())?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(Registration { user, access_token })
    }

    async fn login(&self, command: LoginCommand) -> Result<LoginSession, SessionError> {
        if command.email.is_empty() || command.password.is_empty() {
            return Err(SessionError::InvalidInput(
                "email and password required".to_string(),
            ));
        }

        let deadline = self.deadline();
        let user = self
            .within_deadline(
                deadline,
                "find_user_by_email",
                self.users.find_by_email(&command.email),
            )
            .await?;

        let Some(user) = user else {
            self.reject_unknown_email(command.password).await?;
            tracing::warn!(reason = "unknown_email", "Login failed");
            return Err(SessionError::InvalidCredentials);
        };

        let access_token = self
            .authenticate(&user, command.password)
            .await
            .inspect_err(|e| {
                if matches!(e, SessionError::InvalidCredentials) {
                    tracing::warn!(user_id = %user.id, reason = "wrong_password", "Login failed");
                }
            })?;

        let (new_token, refresh_token) = self.new_refresh_token(user.id, self.authenticator.now())?;
        let record = self
            .within_deadline(deadline, "create_refresh_token", self.refresh_tokens.create(new_token))
            .await?;

        tracing::info!(user_id = %user.id, token_id = %record.id, "User logged in");

        Ok(LoginSession {
            user,
            access_token,
            refresh_token,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RotatedSession, SessionError> {
        if refresh_token.is_empty() {
            return Err(SessionError::InvalidInput(
                "refresh_token required".to_string(),
            ));
        }

        let deadline = self.deadline();
        let digest = self.authenticator.refresh_token_digest(refresh_token);
        let record = self
            .within_deadline(
                deadline,
                "find_refresh_token",
                self.refresh_tokens.find_by_digest(&digest),
            )
            .await?
            .ok_or(SessionError::InvalidRefreshToken)?;

        let now = self.authenticator.now();
        if record.is_revoked() {
            tracing::warn!(
                token_id = %record.id,
                user_id = %record.user_id,
                "Revoked refresh token presented again"
            );
            return Err(SessionError::RefreshTokenExpiredOrRevoked);
        }
        if record.is_expired(now) {
            tracing::info!(token_id = %record.id, user_id = %record.user_id, "Expired refresh token presented");
            return Err(SessionError::RefreshTokenExpiredOrRevoked);
        }

        let user = self
            .within_deadline(deadline, "find_user_by_id", self.users.find_by_id(&record.user_id))
            .await?
            .ok_or_else(|| {
                tracing::error!(token_id = %record.id, user_id = %record.user_id, "Refresh token owner missing");
                SessionError::InvalidRefreshToken
            })?;

        let access_token = self
            .authenticator
            .issue_access_token(user.id, user.email.as_str())?;

        let (replacement, refresh_token) = self.new_refresh_token(user.id, now)?;
        let successor = self
            .within_deadline(
                deadline,
                "rotate_refresh_token",
                self.refresh_tokens.rotate(&record.id, now, replacement),
            )
            .await
            .inspect_err(|e| {
                if matches!(e, SessionError::RefreshTokenExpiredOrRevoked) {
                    tracing::warn!(
                        token_id = %record.id,
                        user_id = %record.user_id,
                        "Refresh token rotated concurrently"
                    );
                }
            })?;

        tracing::info!(
            user_id = %user.id,
            revoked_token_id = %record.id,
            token_id = %successor.id,
            "Refresh token rotated"
        );

        Ok(RotatedSession {
            access_token,
            refresh_token,
        })
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), SessionError> {
        if refresh_token.is_empty() {
            return Err(SessionError::InvalidInput(
                "refresh_token required".to_string(),
            ));
        }

        let deadline = self.deadline();
        let digest = self.authenticator.refresh_token_digest(refresh_token);
        let record = self
            .within_deadline(
                deadline,
                "find_refresh_token",
                self.refresh_tokens.find_by_digest(&digest),
            )
            .await?
            .ok_or(SessionError::InvalidRefreshToken)?;

        self.within_deadline(
            deadline,
            "revoke_refresh_token",
            self.refresh_tokens.revoke(&record.id, self.authenticator.now()),
        )
        .await?;

        tracing::info!(user_id = %record.user_id, token_id = %record.id, "Refresh token revoked");

        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<User, SessionError> {
        self.within_deadline(self.deadline(), "find_user_by_id", self.users.find_by_id(id))
            .await?
            .ok_or(SessionError::UserNotFound(id.to_string()))
    }
}
