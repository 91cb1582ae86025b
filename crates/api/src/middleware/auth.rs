//! Admin authentication: JWT encoding/decoding plus an `AuthAdmin` Axum
//! extractor that validates the Authorization header on admin routes.
//!
//! Admin credentials come from the environment (`ADMIN_USERNAME` +
//! `ADMIN_PASSWORD_HASH`, a bcrypt hash); a successful login is exchanged
//! for a bearer token. Service callers never use this path; they present
//! an `X-API-KEY` on the notify endpoint instead.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use herald_common::config::AppConfig;
use herald_common::error::AppError;

use crate::state::AppState;

/// JWT claims stored in the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject, the admin username
    pub sub: String,
    /// Expiration time (UNIX timestamp)
    pub exp: i64,
    /// Issued at (UNIX timestamp)
    pub iat: i64,
}

/// Authenticated admin extracted from a JWT bearer token.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub username: String,
}

/// Encode a JWT token for the admin user.
pub fn encode_jwt(username: &str, secret: &str, expiry_hours: u64) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub: username.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Auth(format!("Failed to encode JWT: {}", e)))?;

    Ok(token)
}

/// Decode and validate a JWT token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

/// Check a login attempt against the configured admin credentials.
pub fn verify_admin_credentials(
    config: &AppConfig,
    username: &str,
    password: &str,
) -> Result<(), AppError> {
    let Some(password_hash) = config.admin_password_hash.as_deref() else {
        return Err(AppError::Config(
            "Admin password is not configured".to_string(),
        ));
    };

    let password_ok = bcrypt::verify(password, password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

    if username != config.admin_username || !password_ok {
        return Err(AppError::Auth("Invalid username or password".to_string()));
    }

    Ok(())
}

/// Axum `FromRequestParts` implementation for `AuthAdmin`.
///
/// Extracts and validates the JWT from the `Authorization: Bearer <token>`
/// header.
impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = state.config.jwt_secret.clone();

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        async move {
            if let Some(auth) = auth_header
                && let Some(token) = auth.strip_prefix("Bearer ")
            {
                let claims = decode_jwt(token, &secret)?;
                return Ok(AuthAdmin {
                    username: claims.sub,
                });
            }

            Err(AppError::Auth("Missing bearer token".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-unit-tests";

    fn test_config(password_hash: Option<String>) -> AppConfig {
        AppConfig {
            database_url: "unused".to_string(),
            telegram_bot_token: None,
            jwt_secret: TEST_SECRET.to_string(),
            jwt_expiry_hours: 24,
            admin_username: "admin".to_string(),
            admin_password_hash: password_hash,
            send_concurrency: 5,
            send_timeout_secs: 30,
            listen_addr: "0.0.0.0:3000".to_string(),
            db_max_connections: 5,
        }
    }

    #[test]
    fn test_encode_decode_jwt() {
        let token = encode_jwt("admin", TEST_SECRET, 24).unwrap();
        let claims = decode_jwt(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.sub, "admin");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_invalid_secret_rejected() {
        let token = encode_jwt("admin", TEST_SECRET, 24).unwrap();
        assert!(decode_jwt(&token, "wrong-secret").is_err());
    }

    #[test]
    fn test_expired_jwt_rejected() {
        // Create a token that expired 1 hour ago
        let now = Utc::now();
        let claims = Claims {
            sub: "admin".to_string(),
            exp: (now - Duration::hours(1)).timestamp(),
            iat: (now - Duration::hours(2)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(decode_jwt(&token, TEST_SECRET).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(decode_jwt("not.a.valid.jwt", TEST_SECRET).is_err());
    }

    #[test]
    fn test_credential_verification() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        let config = test_config(Some(hash));

        assert!(verify_admin_credentials(&config, "admin", "hunter2").is_ok());
        assert!(matches!(
            verify_admin_credentials(&config, "admin", "wrong"),
            Err(AppError::Auth(_))
        ));
        assert!(matches!(
            verify_admin_credentials(&config, "root", "hunter2"),
            Err(AppError::Auth(_))
        ));
    }

    #[test]
    fn test_login_without_configured_hash_rejected() {
        let config = test_config(None);
        assert!(matches!(
            verify_admin_credentials(&config, "admin", "anything"),
            Err(AppError::Config(_))
        ));
    }
}
