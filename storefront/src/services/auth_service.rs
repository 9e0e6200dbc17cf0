// storefront/src/services/auth_service.rs

//! Password hashing and session tokens.

use crate::errors::AppError;
use crate::models::{User, UserRole};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Hashes a plain-text password with Argon2 and a fresh random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing failed: {}", argon_err))
    })
}

/// `Ok(false)` means the password does not match. A malformed stored hash is
/// an internal error, not a failed login.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password mismatch.");
      Ok(false)
    }
    Err(other) => {
      error!(error = %other, "Argon2 password verification encountered an error.");
      Err(AppError::Internal(format!("Password verification failed: {}", other)))
    }
  }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  /// User id.
  pub sub: Uuid,
  pub role: UserRole,
  pub exp: i64,
  pub iat: i64,
}

/// Signs an HS256 token for `user` that expires after `ttl_minutes`.
pub fn issue_token(user: &User, secret: &str, ttl_minutes: i64) -> Result<String, AppError> {
  let now = Utc::now();
  let claims = Claims {
    sub: user.id,
    role: user.role,
    exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
    iat: now.timestamp(),
  };
  jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
  jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
    .map(|data| data.claims)
    .map_err(|e| {
      debug!("JWT validation failed: {e}");
      AppError::Auth("Invalid or expired token".to_string())
    })
}
