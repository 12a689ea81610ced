use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use jsonwebtoken::crypto;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::AccessClaims;
use super::claims::IssuedAccessToken;
use super::errors::TokenError;
use crate::clock::Clock;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signs and verifies access tokens.
///
/// Uses HS256 with a single shared secret. Expiry is checked against the
/// injected clock rather than the system time.
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl AccessTokenCodec {
    /// Create a codec for a secret and issuer label.
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - The secret is read once at startup and never rotated in-process
    pub fn new(secret: &[u8], issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            clock,
        }
    }

    /// Sign a token for a user valid for `ttl` from now.
    ///
    /// # Errors
    /// * `InvalidTtl` - `ttl` is shorter than one second
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue(
        &self,
        user_id: impl ToString,
        email: &str,
        ttl: Duration,
    ) -> Result<IssuedAccessToken, TokenError> {
        if ttl.num_seconds() <= 0 {
            return Err(TokenError::InvalidTtl);
        }

        let iat = self.clock.now().timestamp();
        let exp = iat + ttl.num_seconds();

        let claims = AccessClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat,
            exp,
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))?;

        let timestamp = |secs: i64| {
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| TokenError::EncodingFailed(format!("timestamp out of range: {}", secs)))
        };

        Ok(IssuedAccessToken {
            token,
            issued_at: timestamp(iat)?,
            expires_at: timestamp(exp)?,
        })
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is checked before anything inside the token is parsed,
    /// so altering any byte of a well-formed token reports `InvalidSignature`.
    ///
    /// # Errors
    /// * `Malformed` - Token is not a parseable JWT with the expected claims
    /// * `InvalidSignature` - Signature does not match the shared secret
    /// * `InvalidIssuer` - Token was signed for another issuer
    /// * `Expired` - The clock is past `exp`
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let (message, signature) = token
            .rsplit_once('.')
            .ok_or_else(|| TokenError::Malformed("expected three segments".to_string()))?;

        if message.split('.').count() != 2 {
            return Err(TokenError::Malformed(
                "expected three segments".to_string(),
            ));
        }

        let signature_matches =
            crypto::verify(signature, message.as_bytes(), &self.decoding_key, ALGORITHM)
                .map_err(|e| TokenError::Malformed(e.to_string()))?;
        if !signature_matches {
            return Err(TokenError::InvalidSignature);
        }

        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked below against the injected clock
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let claims = decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        if claims.is_expired(self.clock.now().timestamp()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;
    use crate::clock::ManualClock;

    const SECRET: &[u8] = b"my_secret_key_at_least_32_bytes_long!";

    fn codec_with_clock() -> (AccessTokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        ));
        let codec = AccessTokenCodec::new(SECRET, "identity-service", clock.clone());
        (codec, clock)
    }

    #[test]
    fn test_issue_and_verify() {
        let (codec, _) = codec_with_clock();

        let issued = codec
            .issue(42, "a@x.com", Duration::minutes(15))
            .expect("Failed to issue token");
        assert!(!issued.token.is_empty());
        assert_eq!(issued.expires_at - issued.issued_at, Duration::minutes(15));
        assert_eq!(issued.expires_in(), 900);

        let claims = codec.verify(&issued.token).expect("Failed to verify token");
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.iss, "identity-service");
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.expires_at(), Some(issued.expires_at));
    }

    #[test]
    fn test_expiry_follows_clock() {
        let (codec, clock) = codec_with_clock();
        let issued = codec.issue(7, "b@x.com", Duration::minutes(15)).unwrap();

        clock.advance(Duration::minutes(15));
        assert!(codec.verify(&issued.token).is_ok(), "valid at exactly exp");

        clock.advance(Duration::seconds(1));
        assert_eq!(codec.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn test_non_positive_ttl_is_rejected() {
        let (codec, _) = codec_with_clock();

        assert_eq!(
            codec.issue(1, "a@x.com", Duration::zero()),
            Err(TokenError::InvalidTtl)
        );
        assert_eq!(
            codec.issue(1, "a@x.com", Duration::seconds(-5)),
            Err(TokenError::InvalidTtl)
        );
    }

    #[test]
    fn test_tampering_any_payload_or_signature_byte_is_detected() {
        let (codec, _) = codec_with_clock();
        let token = codec.issue(42, "a@x.com", Duration::minutes(15)).unwrap().token;

        let header_len = token.find('.').unwrap() + 1;
        for index in header_len..token.len() {
            let original = token.as_bytes()[index];
            if original == b'.' {
                continue;
            }
            let replacement = if original == b'A' { 'B' } else { 'A' };

            let mut tampered = token.clone();
            tampered.replace_range(index..index + 1, &replacement.to_string());

            assert_eq!(
                codec.verify(&tampered),
                Err(TokenError::InvalidSignature),
                "byte {} was altered",
                index
            );
        }
    }

    #[test]
    fn test_tampered_header_is_rejected() {
        let (codec, _) = codec_with_clock();
        let token = codec.issue(42, "a@x.com", Duration::minutes(15)).unwrap().token;

        let mut tampered = token.clone();
        let replacement = if token.as_bytes()[3] == b'A' { "B" } else { "A" };
        tampered.replace_range(3..4, replacement);

        assert_eq!(codec.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let clock = Arc::new(ManualClock::default());
        let issuer = AccessTokenCodec::new(b"secret1_at_least_32_bytes_long_key!", "svc", clock.clone());
        let verifier = AccessTokenCodec::new(b"secret2_at_least_32_bytes_long_key!", "svc", clock);

        let token = issuer.issue(1, "a@x.com", Duration::minutes(5)).unwrap().token;

        assert_eq!(verifier.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_other_issuer_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let foreign = AccessTokenCodec::new(SECRET, "another-service", clock.clone());
        let local = AccessTokenCodec::new(SECRET, "identity-service", clock);

        let token = foreign.issue(1, "a@x.com", Duration::minutes(5)).unwrap().token;

        assert_eq!(local.verify(&token), Err(TokenError::InvalidIssuer));
    }

    #[test]
    fn test_malformed_tokens() {
        let (codec, _) = codec_with_clock();

        for token in ["", "not-a-jwt", "only.two", "a.b.c.d", "invalid.token.here"] {
            assert!(
                matches!(
                    codec.verify(token),
                    Err(TokenError::Malformed(_)) | Err(TokenError::InvalidSignature)
                ),
                "{:?} should not verify",
                token
            );
        }

        assert!(matches!(codec.verify("not-a-jwt"), Err(TokenError::Malformed(_))));
        assert!(matches!(codec.verify("a.b.c.d"), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_signed_token_with_foreign_claims_is_malformed() {
        #[derive(serde::Serialize)]
        struct OtherClaims {
            sub: String,
            exp: i64,
            iss: String,
        }

        let (codec, clock) = codec_with_clock();
        let claims = OtherClaims {
            sub: "1".to_string(),
            exp: clock.now().timestamp() + 60,
            iss: "identity-service".to_string(),
        };
        let token = encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(codec.verify(&token), Err(TokenError::Malformed(_))));
    }
}
