// storefront/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{User, UserRole};
use crate::services::auth_service::{self, MIN_PASSWORD_LEN};
use crate::state::AppState;
use crate::store::{CatalogStore, UserStore};
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
  pub name: String,
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFavoriteRequest {
  pub product_id: Uuid,
}

/// One `@`, a non-empty local part and a dotted domain.
fn is_valid_email(email: &str) -> bool {
  match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
    }
    None => false,
  }
}

fn session_body(user: &User, token: String) -> serde_json::Value {
  json!({
    "success": true,
    "token": token,
    "userData": { "_id": user.id, "name": user.name, "email": user.email },
  })
}

#[instrument(name = "handler::register", skip(app_state, req_payload), fields(email = %req_payload.email))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let email = req.email.trim().to_lowercase();

  if req.name.trim().is_empty() {
    return Err(AppError::Validation("Name is required".to_string()));
  }
  if !is_valid_email(&email) {
    return Err(AppError::Validation("Please enter a valid email".to_string()));
  }
  if req.password.len() < MIN_PASSWORD_LEN {
    return Err(AppError::Validation("Please enter a strong password".to_string()));
  }
  if app_state.store.user_by_email(&email).await?.is_some() {
    return Err(AppError::Validation("User already exists".to_string()));
  }

  let now = Utc::now();
  let user = User {
    id: Uuid::new_v4(),
    name: req.name.trim().to_string(),
    email,
    password_hash: auth_service::hash_password(&req.password)?,
    role: UserRole::User,
    cart: Vec::new(),
    favorites: Vec::new(),
    created_at: now,
    updated_at: now,
  };
  app_state.store.insert_user(&user).await?;
  info!(user_id = %user.id, "User registered.");

  let token = auth_service::issue_token(&user, &app_state.config.jwt_secret, app_state.config.jwt_expiration_minutes)?;
  Ok(HttpResponse::Ok().json(session_body(&user, token)))
}

async fn check_credentials(app_state: &AppState, req: &LoginRequest) -> Result<User, AppError> {
  let email = req.email.trim().to_lowercase();
  let user = app_state
    .store
    .user_by_email(&email)
    .await?
    .ok_or_else(|| AppError::Auth("Invalid credentials".to_string()))?;

  if !auth_service::verify_password(&user.password_hash, &req.password)? {
    warn!(user_id = %user.id, "Password mismatch on login.");
    return Err(AppError::Auth("Invalid credentials".to_string()));
  }
  Ok(user)
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(email = %req_payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
  let user = check_credentials(&app_state, &req_payload).await?;
  let token = auth_service::issue_token(&user, &app_state.config.jwt_secret, app_state.config.jwt_expiration_minutes)?;
  info!(user_id = %user.id, "User logged in.");
  Ok(HttpResponse::Ok().json(session_body(&user, token)))
}

#[instrument(name = "handler::admin_login", skip(app_state, req_payload), fields(email = %req_payload.email))]
pub async fn admin_login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
  let user = check_credentials(&app_state, &req_payload).await?;
  if user.role != UserRole::Admin {
    return Err(AppError::Forbidden("Admin only".to_string()));
  }
  let token = auth_service::issue_token(&user, &app_state.config.jwt_secret, app_state.config.jwt_expiration_minutes)?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "token": token })))
}

#[instrument(name = "handler::profile", skip(app_state, path), fields(user_id = %path.as_ref()))]
pub async fn profile_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let profile = app_state
    .store
    .user(path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "profile": profile })))
}

#[instrument(name = "handler::toggle_favorite", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn toggle_favorite_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ToggleFavoriteRequest>,
) -> Result<HttpResponse, AppError> {
  let product_id = req_payload.product_id;
  let user = app_state
    .store
    .user(auth_user.user_id)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

  let mut favorites = user.favorites;
  let message = match favorites.iter().position(|id| *id == product_id) {
    Some(idx) => {
      favorites.remove(idx);
      "Removed from Favorites"
    }
    None => {
      if app_state.store.product(product_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Product {} not found", product_id)));
      }
      favorites.push(product_id);
      "Added in Favorites"
    }
  };
  app_state.store.save_favorites(auth_user.user_id, &favorites).await?;

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": message,
    "favorites": favorites,
  })))
}

#[instrument(name = "handler::list_favorites", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_favorites_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = app_state
    .store
    .user(auth_user.user_id)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

  let catalog = app_state.store.products_by_ids(&user.favorites).await?;
  let products: Vec<_> = user.favorites.iter().filter_map(|id| catalog.get(id)).collect();

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "favorites": products,
    "favoriteIds": user.favorites,
  })))
}
