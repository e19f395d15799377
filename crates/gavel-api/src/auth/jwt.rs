//! JWT signing and verification (HS256)

use chrono::{Duration, Utc};
use gavel_core::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid, // user_id
    pub super_admin: bool,
    pub exp: i64, // expiration timestamp
    pub iat: i64, // issued at timestamp
}

/// Sign a token for a user. Used by the admin tooling and tests; the public
/// checkout flow does not require a session.
pub fn sign_token(
    secret: &str,
    user_id: Uuid,
    super_admin: bool,
    expiry_hours: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        super_admin,
        exp: (now + Duration::hours(expiry_hours)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Verify a bearer token and return its claims.
pub fn verify_token(secret: &str, token: &str) -> Result<JwtClaims, AppError> {
    decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_sign_and_verify_round_trip() {
        let user_id = Uuid::new_v4();
        let token = sign_token(SECRET, user_id, true, 24).unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.super_admin);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign_token(SECRET, Uuid::new_v4(), false, 24).unwrap();
        assert!(verify_token("another-secret-another-secret--", &token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = sign_token(SECRET, Uuid::new_v4(), false, -1).unwrap();
        assert!(verify_token(SECRET, &token).is_err());
    }
}
