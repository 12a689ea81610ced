//! Authentication primitives library
//!
//! Provides the storage-free building blocks of the session lifecycle:
//! - Password hashing (Argon2id)
//! - Access token issuance and verification (HS256 JWT)
//! - Refresh token generation and digests (256-bit random, SHA-256)
//! - A clock abstraction so expiry can be simulated
//!
//! Services define their own persistence and adapt these implementations.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash));
//! ```
//!
//! ## Access Tokens
//! ```
//! use std::sync::Arc;
//!
//! use auth::{AccessTokenCodec, SystemClock};
//! use chrono::Duration;
//!
//! let codec = AccessTokenCodec::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     "identity-service",
//!     Arc::new(SystemClock),
//! );
//! let issued = codec.issue(42, "a@x.com", Duration::minutes(15)).unwrap();
//! let claims = codec.verify(&issued.token).unwrap();
//! assert_eq!(claims.sub, "42");
//! ```
//!
//! ## Complete Authentication Flow
//! ```
//! use std::sync::Arc;
//!
//! use auth::{Authenticator, SystemClock, TokenSettings};
//!
//! let auth = Authenticator::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     TokenSettings::default(),
//!     Arc::new(SystemClock),
//! );
//!
//! // Register: hash password
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Login: verify, issue an access token and a refresh token
//! let access = auth.authenticate("password123", &hash, 42, "a@x.com").unwrap();
//! let refresh = auth.generate_refresh_token().unwrap();
//!
//! // Later: validate the access token, look up the refresh token by digest
//! let claims = auth.validate_token(&access.token).unwrap();
//! assert_eq!(claims.email, "a@x.com");
//! assert_eq!(auth.refresh_token_digest(&refresh.plaintext), refresh.digest);
//! ```

pub mod authenticator;
pub mod clock;
pub mod jwt;
pub mod password;
pub mod refresh;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use authenticator::TokenSettings;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use jwt::AccessClaims;
pub use jwt::AccessTokenCodec;
pub use jwt::IssuedAccessToken;
pub use jwt::TokenError;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use refresh::GeneratedRefreshToken;
pub use refresh::RefreshTokenError;
pub use refresh::RefreshTokenFactory;
