use std::sync::Arc;

use auth::Authenticator;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::request::Parts;
use axum::http::Extensions;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::session::models::UserId;

const BEARER_SCHEME: &str = "bearer";

/// Extension type to store the authenticated caller in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: String,
}

/// Middleware that validates bearer access tokens and adds the caller to
/// request extensions
pub async fn authenticate(
    State(authenticator): State<Arc<Authenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let claims = authenticator.validate_token(token).map_err(|e| {
        tracing::warn!(error = %e, "Access token rejected");
        invalid_token()
    })?;

    let user_id = UserId::from_string(&claims.sub).map_err(|e| {
        tracing::warn!(error = %e, "Access token subject is not a user id");
        invalid_token()
    })?;

    req.extensions_mut().insert(AuthenticatedUser {
        user_id,
        email: claims.email,
    });

    Ok(next.run(req).await)
}

fn invalid_token() -> ApiError {
    ApiError::Unauthorized("invalid token".to_string())
}

/// Token from an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Caller's user id, if the identity middleware ran for this request.
pub fn current_user_id(extensions: &Extensions) -> Option<UserId> {
    extensions
        .get::<AuthenticatedUser>()
        .map(|user| user.user_id)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(authorization).unwrap(),
        );
        headers
    }

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("BEARER abc")), Some("abc"));
    }

    #[test]
    fn test_bearer_token_rejections() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwdw==")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
        assert_eq!(bearer_token(&headers("Bearerabc")), None);
    }

    #[test]
    fn test_current_user_id_reads_extensions() {
        let mut extensions = Extensions::new();
        assert_eq!(current_user_id(&extensions), None);

        extensions.insert(AuthenticatedUser {
            user_id: UserId(5),
            email: "a@x.com".to_string(),
        });
        assert_eq!(current_user_id(&extensions), Some(UserId(5)));
    }

    #[tokio::test]
    async fn test_extractor_rejects_without_identity() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();

        let missing = AuthenticatedUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(missing, Err(ApiError::Unauthorized(_))));

        parts.extensions.insert(AuthenticatedUser {
            user_id: UserId(5),
            email: "a@x.com".to_string(),
        });
        let found = AuthenticatedUser::from_request_parts(&mut parts, &()).await;
        assert_eq!(found.map(|user| user.user_id), Ok(UserId(5)));
    }
}
