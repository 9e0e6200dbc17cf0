// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::CartLine;
use crate::pipelines::cart_pipeline::run_add_to_cart;
use crate::state::AppState;
use crate::store::UserStore;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
  #[serde(alias = "itemId")]
  pub product_id: Uuid,
  #[serde(default)]
  pub size: Option<String>,
  #[serde(default)]
  pub color: Option<String>,
  #[serde(default = "one")]
  pub quantity: i32,
}

fn one() -> i32 {
  1
}

/// Sets an existing line to `quantity`. Zero removes the line.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
  #[serde(alias = "itemId")]
  pub product_id: Uuid,
  #[serde(default)]
  pub size: Option<String>,
  #[serde(default)]
  pub color: Option<String>,
  pub quantity: i32,
}

#[instrument(name = "handler::get_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = app_state
    .store
    .user(auth_user.user_id)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "cartData": user.cart })))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, auth_user, req_payload),
  fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<AddToCartRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let line = CartLine {
    product_id: req.product_id,
    size: req.size,
    color: req.color,
    quantity: req.quantity,
  };
  let cart = run_add_to_cart(app_state.get_ref().clone(), auth_user.user_id, line).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Added To Cart",
    "cartData": cart,
  })))
}

#[instrument(name = "handler::update_cart", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn update_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<UpdateCartRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  if req.quantity < 0 {
    return Err(AppError::Validation("Quantity cannot be negative".to_string()));
  }

  let user = app_state
    .store
    .user(auth_user.user_id)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
  let mut cart = user.cart;
  let idx = cart
    .iter()
    .position(|l| l.same_variant(req.product_id, &req.size, &req.color))
    .ok_or_else(|| AppError::NotFound("Item is not in the cart".to_string()))?;

  if req.quantity == 0 {
    cart.remove(idx);
  } else {
    cart[idx].quantity = req.quantity;
  }
  app_state.store.save_cart(auth_user.user_id, &cart).await?;
  info!(product_id = %req.product_id, quantity = req.quantity, "Cart line updated.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Cart Updated",
    "cartData": cart,
  })))
}
