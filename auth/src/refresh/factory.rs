use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::Digest;
use sha2::Sha256;

use super::errors::RefreshTokenError;
use crate::clock::Clock;

/// Number of random bytes behind every refresh token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// A refresh token as handed out to the caller, with the values to persist.
///
/// `plaintext` goes to the client exactly once; only `digest` is stored.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedRefreshToken {
    pub plaintext: String,
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for GeneratedRefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedRefreshToken")
            .field("plaintext", &"<redacted>")
            .field("digest", &self.digest)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Generates opaque refresh tokens and their storable digests.
///
/// The input already carries full entropy, so a single SHA-256 pass is
/// enough for the digest; no salt or work factor is involved.
pub struct RefreshTokenFactory {
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl RefreshTokenFactory {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { ttl, clock }
    }

    /// Draw a new token from the OS random source.
    ///
    /// # Errors
    /// * `EntropyUnavailable` - The OS random source failed
    pub fn generate(&self) -> Result<GeneratedRefreshToken, RefreshTokenError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| RefreshTokenError::EntropyUnavailable(e.to_string()))?;

        let plaintext = URL_SAFE_NO_PAD.encode(bytes);
        let digest = Self::digest_of(&plaintext);

        Ok(GeneratedRefreshToken {
            plaintext,
            digest,
            expires_at: self.clock.now() + self.ttl,
        })
    }

    /// Deterministic digest of a presented token, for lookup in the store.
    pub fn digest_of(plaintext: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(plaintext.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;

    use super::*;
    use crate::clock::ManualClock;

    fn factory() -> (RefreshTokenFactory, DateTime<Utc>) {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let factory = RefreshTokenFactory::new(Duration::days(30), Arc::new(ManualClock::new(now)));
        (factory, now)
    }

    #[test]
    fn test_generate() {
        let (factory, now) = factory();

        let token = factory.generate().expect("Failed to generate token");

        // 32 bytes -> 43 base64url characters without padding
        assert_eq!(token.plaintext.len(), 43);
        assert_eq!(URL_SAFE_NO_PAD.decode(&token.plaintext).unwrap().len(), TOKEN_BYTES);
        assert_eq!(token.digest, RefreshTokenFactory::digest_of(&token.plaintext));
        assert_ne!(token.digest, token.plaintext);
        assert_eq!(token.expires_at, now + Duration::days(30));
    }

    #[test]
    fn test_tokens_are_unique() {
        let (factory, _) = factory();

        let plaintexts: HashSet<String> = (0..100)
            .map(|_| factory.generate().unwrap().plaintext)
            .collect();

        assert_eq!(plaintexts.len(), 100);
    }

    #[test]
    fn test_digest_of_known_value() {
        assert_eq!(
            RefreshTokenFactory::digest_of(""),
            "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU"
        );
    }

    #[test]
    fn test_digest_is_deterministic_and_input_sensitive() {
        let a = RefreshTokenFactory::digest_of("token-a");

        assert_eq!(a, RefreshTokenFactory::digest_of("token-a"));
        assert_ne!(a, RefreshTokenFactory::digest_of("token-b"));
    }

    #[test]
    fn test_debug_redacts_plaintext() {
        let (factory, _) = factory();
        let token = factory.generate().unwrap();

        let rendered = format!("{:?}", token);
        assert!(!rendered.contains(&token.plaintext));
        assert!(rendered.contains("<redacted>"));
    }
}
