// crates/server/src/auth.rs
//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs carrying `{user_id, email, exp}`. Issuing them is
//! somebody else's job; this module only verifies them and exposes the
//! caller's identity to handlers through the [`AuthUser`] extractor.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use transcribe_core::OwnerId;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("invalid authorization format")]
    InvalidFormat,

    #[error("invalid or expired token")]
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: OwnerId,
    pub email: String,
    pub exp: u64,
}

/// Verifies bearer tokens against the shared HS256 secret.
#[derive(Clone)]
pub struct Authenticator {
    decoding: DecodingKey,
    validation: Validation,
}

impl Authenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            })
    }

    /// Authenticate from the `Authorization` header, falling back to a
    /// `?token=` query value when the header is absent. Browsers cannot set
    /// headers on websocket upgrades.
    pub fn authenticate(
        &self,
        headers: &HeaderMap,
        query_token: Option<&str>,
    ) -> Result<Claims, AuthError> {
        match bearer_token(headers) {
            Ok(token) => self.verify(token),
            Err(AuthError::MissingHeader) => match query_token {
                Some(token) if !token.is_empty() => self.verify(token),
                _ => Err(AuthError::MissingHeader),
            },
            Err(e) => Err(e),
        }
    }
}

/// The token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;
    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }
    value
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// The authenticated caller of an API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: OwnerId,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        Ok(state.auth.verify(token)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn mint(secret: &str, user_id: OwnerId, email: &str, exp: u64) -> String {
        let claims = Claims {
            user_id,
            email: email.into(),
            exp,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_an_hour() -> u64 {
        chrono::Utc::now().timestamp() as u64 + 3600
    }

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn test_valid_token_yields_claims() {
        let auth = Authenticator::new("secret");
        let token = mint("secret", 42, "a@example.com", in_an_hour());
        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "a@example.com");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = mint("one", 1, "a@b.c", in_an_hour());
        assert_eq!(
            Authenticator::new("two").verify(&token),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = Authenticator::new("secret");
        let token = mint("secret", 1, "a@b.c", 1_000);
        assert_eq!(auth.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), Err(AuthError::InvalidFormat));
        assert_eq!(bearer_token(&headers("Bearer ")), Err(AuthError::InvalidFormat));
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingHeader));
    }

    #[test]
    fn test_query_token_fallback_only_when_header_absent() {
        let auth = Authenticator::new("secret");
        let token = mint("secret", 9, "q@b.c", in_an_hour());

        let claims = auth.authenticate(&HeaderMap::new(), Some(&token)).unwrap();
        assert_eq!(claims.user_id, 9);

        assert_eq!(
            auth.authenticate(&headers("Token nope"), Some(&token)),
            Err(AuthError::InvalidFormat)
        );
        assert_eq!(
            auth.authenticate(&HeaderMap::new(), None),
            Err(AuthError::MissingHeader)
        );
    }
}
