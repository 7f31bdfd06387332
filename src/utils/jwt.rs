// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::User,
    state::AppState,
    store::{Condition, Db},
};

/// Lifetime of an access token: 30 days.
pub const TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject: the id of the signed-in user.
    pub user_id: Uuid,
    pub fullname: String,
    /// Issued at, Unix timestamp.
    pub iat: usize,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: Uuid, fullname: &str, ttl_secs: u64) -> Result<Self, AppError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .as_secs();

        Ok(Self {
            user_id,
            fullname: fullname.to_owned(),
            iat: now as usize,
            exp: (now + ttl_secs) as usize,
        })
    }
}

/// Why the access guard refused a request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthFailure {
    /// No `Authorization: Bearer` header.
    MissingCredential,
    /// Malformed token, bad signature or expired.
    InvalidCredential(String),
    /// Token is valid but its user no longer exists.
    SubjectRevoked,
}

impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::MissingCredential => {
                AppError::Unauthorized("Missing bearer authorization".to_string())
            }
            AuthFailure::InvalidCredential(_) | AuthFailure::SubjectRevoked => {
                AppError::Unauthorized("Invalid access token".to_string())
            }
        }
    }
}

/// Signs an HS256 token for the user, valid for `TOKEN_TTL_SECS`.
pub fn sign_jwt(user_id: Uuid, fullname: &str, secret: &str) -> Result<String, AppError> {
    let claims = Claims::new(user_id, fullname, TOKEN_TTL_SECS)?;
    sign_claims(&claims, secret)
}

pub fn sign_claims(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies signature and expiry of a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AuthFailure> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| AuthFailure::InvalidCredential(e.to_string()))?;

    Ok(token_data.claims)
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or(AuthFailure::MissingCredential)
}

/// Access guard: credential present, token verified, subject still a live user.
pub async fn authorize(db: &Db, secret: &str, headers: &HeaderMap) -> Result<Claims, AppError> {
    let token = bearer_token(headers)?;

    let claims = verify_jwt(token, secret).inspect_err(|failure| {
        tracing::debug!("Rejected access token: {:?}", failure);
    })?;

    let subject = db
        .store::<User>()
        .find_one(&[Condition::eq("id", claims.user_id)])
        .await?;

    if subject.is_none() {
        tracing::debug!("Token subject {} no longer exists", claims.user_id);
        return Err(AuthFailure::SubjectRevoked.into());
    }

    Ok(claims)
}

/// Axum Middleware: Authentication.
///
/// Runs the access guard once per request and injects `Claims` into the
/// request extensions for handlers to use.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authorize(&state.db, &state.config.secret_key, req.headers()).await?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "unit-test-secret";

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn signed_tokens_round_trip_with_thirty_day_expiry() {
        let user_id = Uuid::new_v4();
        let token = sign_jwt(user_id, "Jane", SECRET).unwrap();
        let claims = verify_jwt(&token, SECRET).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.fullname, "Jane");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS as usize);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = sign_jwt(Uuid::new_v4(), "Jane", SECRET).unwrap();
        assert!(matches!(
            verify_jwt(&token, "another-secret"),
            Err(AuthFailure::InvalidCredential(_))
        ));
    }

    #[test]
    fn expired_tokens_are_invalid() {
        let mut claims = Claims::new(Uuid::new_v4(), "Jane", 0).unwrap();
        claims.iat -= 7200;
        claims.exp -= 3600;
        let token = sign_claims(&claims, SECRET).unwrap();
        assert!(matches!(
            verify_jwt(&token, SECRET),
            Err(AuthFailure::InvalidCredential(_))
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            verify_jwt("not-a-jwt", SECRET),
            Err(AuthFailure::InvalidCredential(_))
        ));
    }

    #[test]
    fn bearer_header_is_required() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthFailure::MissingCredential));
        assert_eq!(bearer_token(&headers("Basic abc")), Err(AuthFailure::MissingCredential));
        assert_eq!(bearer_token(&headers("Bearer ")), Err(AuthFailure::MissingCredential));
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Ok("abc.def"));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("bearer abc.def")), Ok("abc.def"));
        assert_eq!(bearer_token(&headers("BEARER abc.def")), Ok("abc.def"));
        assert_eq!(bearer_token(&headers("Bearerabc.def")), Err(AuthFailure::MissingCredential));
    }

    #[tokio::test]
    async fn unknown_subjects_are_revoked() {
        let db = Db::memory();
        let token = sign_jwt(Uuid::new_v4(), "Ghost", SECRET).unwrap();
        let err = authorize(&db, SECRET, &headers(&format!("Bearer {}", token)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg == "Invalid access token"));
    }
}
