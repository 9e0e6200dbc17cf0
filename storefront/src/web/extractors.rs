// storefront/src/web/extractors.rs

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::UserRole;
use crate::services::auth_service;
use crate::state::AppState;

/// Caller identity decoded from the session token.
///
/// The token is read from the `token` header first, then from
/// `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub role: UserRole,
}

impl AuthenticatedUser {
  pub fn is_admin(&self) -> bool {
    self.role == UserRole::Admin
  }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
  if let Some(raw) = req.headers().get("token").and_then(|v| v.to_str().ok()) {
    let raw = raw.trim();
    if !raw.is_empty() {
      return Some(raw.to_string());
    }
  }
  req
    .headers()
    .get(actix_web::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let app_state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;

  let token = bearer_token(req).ok_or_else(|| {
    warn!(path = %req.path(), "Request without session token.");
    AppError::Auth("Not Authorized Login Again".to_string())
  })?;
  let claims = auth_service::decode_token(&token, &app_state.config.jwt_secret)?;

  Ok(AuthenticatedUser {
    user_id: claims.sub,
    role: claims.role,
  })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(authenticate(req))
  }
}

/// An [`AuthenticatedUser`] whose token carries the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let result = authenticate(req).and_then(|user| {
      if user.is_admin() {
        Ok(AdminUser(user))
      } else {
        warn!(user_id = %user.user_id, path = %req.path(), "Admin route refused.");
        Err(AppError::Forbidden("Not authorized as admin".to_string()))
      }
    });
    ready(result)
  }
}
