//! Authenticated actor extraction

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use gavel_core::AppError;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AuthConfig;

use super::jwt::verify_token;

/// Authenticated actor extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub is_super_admin: bool,
}

/// Actor that may be absent: guest checkout runs unauthenticated.
#[derive(Debug, Clone)]
pub struct OptionalAuthContext(pub Option<AuthContext>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    AuthConfig: FromRef<S>,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthConfig::from_ref(state);
        let token = bearer_token(parts).ok_or_else(|| {
            HttpAppError(AppError::Unauthorized(
                "Missing bearer token".to_string(),
            ))
        })?;
        let claims = verify_token(&auth.jwt_secret, token).map_err(HttpAppError)?;
        Ok(AuthContext {
            user_id: claims.sub,
            is_super_admin: claims.super_admin,
        })
    }
}

impl<S> FromRequestParts<S> for OptionalAuthContext
where
    S: Send + Sync,
    AuthConfig: FromRef<S>,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            // A present-but-invalid token is rejected rather than silently
            // downgraded to guest checkout.
            Some(_) => Ok(OptionalAuthContext(Some(
                AuthContext::from_request_parts(parts, state).await?,
            ))),
            None => Ok(OptionalAuthContext(None)),
        }
    }
}
