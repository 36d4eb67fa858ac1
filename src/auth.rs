use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entities::{user, UserRole},
    errors::{ApiError, ServiceError},
    AppState,
};

/// JWT claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub username: String,
    pub role: UserRole,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// Issues and verifies the HS256 tokens used by the HTTP layer.
#[derive(Clone)]
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_secs: i64,
}

impl AuthService {
    pub fn new(secret: &str, expiry_secs: usize) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_secs: expiry_secs as i64,
        }
    }

    /// Issues a token for a user record.
    pub fn issue_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now,
            exp: now + self.expiry_secs,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {e}")))
    }

    /// Verifies a token and returns its claims. Expired or tampered tokens
    /// are rejected as `Unauthorized`.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ServiceError::Unauthorized("Invalid or expired token".to_string()))
    }
}

/// Hashes a password with Argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))
}

/// Verifies a password against a stored Argon2 hash.
pub fn verify_password(hash: &str, password: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ServiceError::InternalError(format!("corrupt password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Authenticated user extracted from the `Authorization: Bearer` header.
///
/// Handlers that merely stamp "who acted" take `Option<AuthUser>`; handlers
/// that require a login take it directly and reject the request otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization token".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Malformed authorization header".to_string()))?
            .trim();

        let claims = state.auth.verify_token(token)?;
        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            username: "ana".to_string(),
            name: Some("Ana".to_string()),
            password_hash: String::new(),
            role: UserRole::Admin,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn token_roundtrip() {
        let service = AuthService::new("a_sufficiently_long_test_secret_value", 3600);
        let user = sample_user();

        let token = service.issue_token(&user).unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = AuthService::new("a_sufficiently_long_test_secret_value", 3600);
        let other = AuthService::new("a_different_secret_for_another_node!!", 3600);

        let token = service.issue_token(&sample_user()).unwrap();
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password(&hash, "hunter2").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }
}
