// storefront/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{NewProduct, ProductPatch};
use crate::state::AppState;
use crate::store::CatalogStore;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SingleProductRequest {
  pub product_id: Uuid,
}

#[derive(Deserialize, Debug)]
pub struct RemoveProductRequest {
  pub id: Uuid,
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.store.list_products().await?;
  info!("Successfully fetched {} products.", products.len());
  Ok(HttpResponse::Ok().json(json!({ "success": true, "products": products })))
}

#[instrument(name = "handler::single_product", skip(app_state, req_payload), fields(product_id = %req_payload.product_id))]
pub async fn single_product_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SingleProductRequest>,
) -> Result<HttpResponse, AppError> {
  let product_id = req_payload.product_id;
  let product = app_state
    .store
    .product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "product": product })))
}

#[instrument(name = "handler::add_product", skip(app_state, _admin, req_payload))]
pub async fn add_product_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  let product = req_payload.into_inner().into_product()?;
  app_state.store.insert_product(&product).await?;
  info!(product_id = %product.id, name = %product.name, "Product added.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Product Added",
    "product": product,
  })))
}

#[instrument(name = "handler::update_product", skip(app_state, _admin, path, req_payload), fields(product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProductPatch>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let mut product = app_state
    .store
    .product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

  req_payload.into_inner().apply(&mut product)?;
  app_state.store.update_product(&product).await?;
  info!(%product_id, "Product updated.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Product updated successfully",
    "product": product,
  })))
}

/// Orders that reference the product keep their snapshot lines.
#[instrument(name = "handler::remove_product", skip(app_state, _admin, req_payload), fields(product_id = %req_payload.id))]
pub async fn remove_product_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<RemoveProductRequest>,
) -> Result<HttpResponse, AppError> {
  if !app_state.store.remove_product(req_payload.id).await? {
    return Err(AppError::NotFound("Product not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Product Removed" })))
}
