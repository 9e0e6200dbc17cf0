// storefront/src/web/handlers/review_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Review;
use crate::state::AppState;
use crate::store::{CatalogStore, ReviewStore, Store};
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddReviewRequest {
  pub product_id: Uuid,
  pub rating: i32,
  #[serde(default)]
  pub comment: String,
}

#[derive(Deserialize, Debug)]
pub struct UpdateReviewRequest {
  pub rating: Option<i32>,
  pub comment: Option<String>,
}

fn check_rating(rating: i32) -> Result<(), AppError> {
  if (1..=5).contains(&rating) {
    Ok(())
  } else {
    Err(AppError::Validation("Rating must be between 1 and 5".to_string()))
  }
}

/// Recomputes the product's average and count from its reviews.
async fn refresh_rating(store: &dyn Store, product_id: Uuid) -> Result<(), AppError> {
  let reviews = store.reviews_for_product(product_id).await?;
  let total = reviews.len() as i32;
  let average = if total == 0 {
    0.0
  } else {
    reviews.iter().map(|r| f64::from(r.rating)).sum::<f64>() / f64::from(total)
  };
  store.set_rating(product_id, average, total).await
}

#[instrument(name = "handler::add_review", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id))]
pub async fn add_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<AddReviewRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  check_rating(req.rating)?;

  let store = app_state.store.as_ref();
  if store.product(req.product_id).await?.is_none() {
    return Err(AppError::NotFound(format!("Product {} not found", req.product_id)));
  }
  if store.review_by_author(req.product_id, auth_user.user_id).await?.is_some() {
    return Err(AppError::Validation("You have already reviewed this product".to_string()));
  }

  let now = Utc::now();
  let review = Review {
    id: Uuid::new_v4(),
    product_id: req.product_id,
    user_id: auth_user.user_id,
    rating: req.rating,
    comment: req.comment,
    created_at: now,
    updated_at: now,
  };
  store.insert_review(&review).await?;
  refresh_rating(store, review.product_id).await?;
  info!(review_id = %review.id, "Review added.");

  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Review added successfully",
    "data": review,
  })))
}

#[instrument(name = "handler::product_reviews", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn product_reviews_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let reviews = app_state.store.reviews_for_product(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "data": reviews })))
}

#[instrument(name = "handler::update_review", skip(app_state, auth_user, path, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn update_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateReviewRequest>,
) -> Result<HttpResponse, AppError> {
  let store = app_state.store.as_ref();
  let mut review = store
    .review(path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
  if review.user_id != auth_user.user_id && !auth_user.is_admin() {
    return Err(AppError::Forbidden("You are not authorized to update this review".to_string()));
  }

  let req = req_payload.into_inner();
  if let Some(rating) = req.rating {
    check_rating(rating)?;
    review.rating = rating;
  }
  if let Some(comment) = req.comment.filter(|c| !c.trim().is_empty()) {
    review.comment = comment;
  }
  review.updated_at = Utc::now();

  store.update_review(&review).await?;
  refresh_rating(store, review.product_id).await?;

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Review updated successfully",
    "data": review,
  })))
}

#[instrument(name = "handler::delete_review", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id))]
pub async fn delete_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let store = app_state.store.as_ref();
  let review = store
    .review(path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
  if review.user_id != auth_user.user_id {
    return Err(AppError::Forbidden("You are not authorized to delete this review".to_string()));
  }

  store.delete_review(review.id).await?;
  refresh_rating(store, review.product_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Review deleted successfully" })))
}
