use std::sync::Arc;
use std::sync::OnceLock;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::clock::Clock;
use crate::jwt::AccessClaims;
use crate::jwt::AccessTokenCodec;
use crate::jwt::IssuedAccessToken;
use crate::jwt::TokenError;
use crate::password::PasswordError;
use crate::password::PasswordHasher;
use crate::refresh::GeneratedRefreshToken;
use crate::refresh::RefreshTokenError;
use crate::refresh::RefreshTokenFactory;

/// Token lifetimes and issuer label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    pub issuer: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: "identity-service".to_string(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(30),
        }
    }
}

/// Authentication coordinator combining password hashing, access tokens and
/// refresh tokens behind one clock.
///
/// Built once at startup and shared read-only for the life of the process.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    token_codec: AccessTokenCodec,
    refresh_tokens: RefreshTokenFactory,
    access_token_ttl: Duration,
    clock: Arc<dyn Clock>,
    placeholder_hash: OnceLock<String>,
}

const PLACEHOLDER_PASSWORD: &str = "placeholder-password-never-issued";

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `signing_secret` - Secret key for access token signing
    /// * `settings` - Issuer and token lifetimes
    /// * `clock` - Time source for issuance and expiry
    pub fn new(signing_secret: &[u8], settings: TokenSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            password_hasher: PasswordHasher::new(),
            token_codec: AccessTokenCodec::new(signing_secret, settings.issuer, clock.clone()),
            refresh_tokens: RefreshTokenFactory::new(settings.refresh_token_ttl, clock.clone()),
            access_token_ttl: settings.access_token_ttl,
            clock,
            placeholder_hash: OnceLock::new(),
        }
    }

    /// Replace the password hasher, e.g. to apply a configured work factor.
    pub fn with_password_hasher(mut self, password_hasher: PasswordHasher) -> Self {
        self.password_hasher = password_hasher;
        self.placeholder_hash = OnceLock::new();
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    pub fn verify_password(&self, password: &str, stored_hash: &str) -> bool {
        self.password_hasher.verify(password, stored_hash)
    }

    /// Run one full verification against a digest no account owns.
    ///
    /// Always false. The digest is produced once with the configured cost, so
    /// this takes as long as checking a real password.
    pub fn verify_placeholder(&self, password: &str) -> bool {
        let placeholder = self.placeholder_hash.get_or_init(|| {
            self.password_hasher
                .hash(PLACEHOLDER_PASSWORD)
                .unwrap_or_default()
        });

        std::hint::black_box(self.password_hasher.verify(password, placeholder));
        false
    }

    /// Verify credentials and issue an access token.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `TokenError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        user_id: impl ToString,
        email: &str,
    ) -> Result<IssuedAccessToken, AuthenticationError> {
        if !self.verify_password(password, stored_hash) {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(self.issue_access_token(user_id, email)?)
    }

    /// Issue an access token without password verification.
    ///
    /// Used after registration and during refresh, where identity has already
    /// been established by other means.
    pub fn issue_access_token(
        &self,
        user_id: impl ToString,
        email: &str,
    ) -> Result<IssuedAccessToken, TokenError> {
        self.token_codec.issue(user_id, email, self.access_token_ttl)
    }

    /// Validate and decode an access token.
    pub fn validate_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.token_codec.verify(token)
    }

    pub fn generate_refresh_token(&self) -> Result<GeneratedRefreshToken, RefreshTokenError> {
        self.refresh_tokens.generate()
    }

    pub fn refresh_token_digest(&self, plaintext: &str) -> String {
        RefreshTokenFactory::digest_of(plaintext)
    }
}
