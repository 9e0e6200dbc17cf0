// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::lifecycle;
use crate::models::{OrderLineRequest, OrderStatus, PaymentMethod, ShippingAddress};
use crate::pipelines::checkout_pipeline::{run_checkout, CheckoutReceipt};
use crate::pipelines::contexts::{CheckoutChannel, CheckoutCtxData, GatewaySession, TransitionAction};
use crate::pipelines::order_transition_pipeline::run_transition;
use crate::pipelines::reorder_pipeline::run_reorder;
use crate::state::AppState;
use crate::store::{page_offset, OrderStore, OrderWrite, UserOrderQuery};
use crate::web::extractors::{AdminUser, AuthenticatedUser};

const DEFAULT_PAGE_LIMIT: i64 = 10;
const MAX_PAGE_LIMIT: i64 = 100;

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrderRequest {
  pub product_id: Uuid,
  pub quantity: i32,
  #[serde(default)]
  pub size: Option<String>,
  #[serde(default)]
  pub color: Option<String>,
  #[serde(default)]
  pub shipping_address: ShippingAddress,
  pub payment_method: String,
}

/// Body of `/place`. Any client-side `totalAmount` or item prices are ignored.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
  pub items: Vec<OrderLineRequest>,
  #[serde(default)]
  pub shipping_address: ShippingAddress,
  #[serde(default)]
  pub payment_method: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrderRequest {
  pub items: Vec<OrderLineRequest>,
  #[serde(default)]
  pub shipping_address: ShippingAddress,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
  pub order_id: Uuid,
  pub status: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct UserOrdersQuery {
  pub status: Option<String>,
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

impl UserOrdersQuery {
  fn into_store_query(self, user_id: Uuid) -> Result<UserOrderQuery, AppError> {
    let status = match self.status.as_deref().map(str::trim) {
      None | Some("") | Some("all") => None,
      Some(raw) => Some(raw.parse::<OrderStatus>()?),
    };
    let page = self.page.unwrap_or(1);
    let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if page < 1 {
      return Err(AppError::Validation("page must be at least 1".to_string()));
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
      return Err(AppError::Validation(format!("limit must be between 1 and {}", MAX_PAGE_LIMIT)));
    }
    page_offset(page, limit)?;
    Ok(UserOrderQuery {
      user_id,
      status,
      page,
      limit,
    })
  }
}

// --- Creation ---

#[instrument(
  name = "handler::direct_order",
  skip(app_state, auth_user, req_payload),
  fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id)
)]
pub async fn direct_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<DirectOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let payment_method: PaymentMethod = req.payment_method.parse()?;
  let line = OrderLineRequest {
    product_id: req.product_id,
    quantity: req.quantity,
    size: req.size,
    color: req.color,
  };

  let ctx = CheckoutCtxData::new(
    app_state.get_ref().clone(),
    auth_user.user_id,
    CheckoutChannel::Direct,
    payment_method,
    vec![line],
    req.shipping_address,
  );
  let CheckoutReceipt { order, .. } = run_checkout(ctx).await?;
  info!(order_id = %order.id, "Direct order placed.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order placed successfully",
    "order": order,
  })))
}

#[instrument(name = "handler::place_order", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let payment_method = match req.payment_method.as_deref() {
    Some(raw) => raw.parse::<PaymentMethod>()?,
    None => PaymentMethod::Cod,
  };

  let ctx = CheckoutCtxData::new(
    app_state.get_ref().clone(),
    auth_user.user_id,
    CheckoutChannel::Place,
    payment_method,
    req.items,
    req.shipping_address,
  );
  let CheckoutReceipt { order, .. } = run_checkout(ctx).await?;
  info!(order_id = %order.id, "Cart order placed.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order Placed Successfully",
    "order": order,
  })))
}

#[instrument(name = "handler::stripe_order", skip(app_state, auth_user, http_req, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn stripe_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  http_req: HttpRequest,
  req_payload: web::Json<GatewayOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let origin = http_req
    .headers()
    .get("origin")
    .and_then(|v| v.to_str().ok())
    .map(|o| o.trim_end_matches('/').to_string());

  let mut ctx = CheckoutCtxData::new(
    app_state.get_ref().clone(),
    auth_user.user_id,
    CheckoutChannel::Stripe,
    PaymentMethod::Stripe,
    req.items,
    req.shipping_address,
  );
  ctx.origin = origin;

  let receipt = run_checkout(ctx).await?;
  match receipt.session {
    Some(GatewaySession::Stripe { session_url, .. }) => Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "session_url": session_url,
      "orderId": receipt.order.id,
    }))),
    _ => {
      warn!(order_id = %receipt.order.id, "Stripe checkout finished without a session.");
      Err(AppError::Internal("Checkout session was not created.".to_string()))
    }
  }
}

#[instrument(name = "handler::razorpay_order", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn razorpay_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<GatewayOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let ctx = CheckoutCtxData::new(
    app_state.get_ref().clone(),
    auth_user.user_id,
    CheckoutChannel::Razorpay,
    PaymentMethod::Razorpay,
    req.items,
    req.shipping_address,
  );

  let receipt = run_checkout(ctx).await?;
  match receipt.session {
    Some(GatewaySession::Razorpay(razorpay_order)) => Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "order": razorpay_order,
      "orderId": receipt.order.id,
    }))),
    _ => {
      warn!(order_id = %receipt.order.id, "Razorpay checkout finished without a gateway order.");
      Err(AppError::Internal("Gateway order was not created.".to_string()))
    }
  }
}

// --- Admin ---

#[instrument(name = "handler::list_orders", skip(app_state, admin))]
pub async fn list_orders_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let orders = app_state.store.list_orders().await?;
  info!(admin_id = %admin.0.user_id, count = orders.len(), "Listed all orders.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}

/// Overwrites the status without any transition guard.
#[instrument(name = "handler::update_status", skip(app_state, admin, req_payload), fields(order_id = %req_payload.order_id))]
pub async fn update_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let target: OrderStatus = req.status.trim().parse()?;

  let order = app_state
    .store
    .order(req.order_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  let transition = lifecycle::override_status(&order, target);
  let updated = app_state
    .store
    .commit(OrderWrite::update(&order, transition.order), &transition.stock)
    .await?;
  info!(admin_id = %admin.0.user_id, from = %order.status, to = %updated.status, "Order status overwritten.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Status Updated",
    "order": updated,
  })))
}

// --- Customer views and transitions ---

#[instrument(name = "handler::user_orders", skip(app_state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn user_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<UserOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let store_query = query.into_inner().into_store_query(auth_user.user_id)?;
  let page = app_state.store.user_orders(&store_query).await?;

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "totalPages": page.total_pages(),
    "currentPage": page.page,
    "totalOrders": page.total,
    "orders": page.items,
  })))
}

/// Removes the record outright. Stock is not given back.
#[instrument(name = "handler::delete_order", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id))]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = app_state
    .store
    .order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  if order.user_id != auth_user.user_id && !auth_user.is_admin() {
    return Err(AppError::Forbidden("You do not have access to this order".to_string()));
  }

  if !app_state.store.delete_order(order_id).await? {
    return Err(AppError::NotFound("Order not found".to_string()));
  }
  info!(%order_id, "Order removed.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Order removed successfully" })))
}

async fn transition_response(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  order_id: Uuid,
  action: TransitionAction,
  message: &str,
) -> Result<HttpResponse, AppError> {
  let order = run_transition(app_state.get_ref().clone(), auth_user.user_id, order_id, action).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": message,
    "order": order,
  })))
}

#[instrument(name = "handler::cancel_order", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  transition_response(
    app_state,
    auth_user,
    path.into_inner(),
    TransitionAction::Cancel,
    "Order cancelled successfully",
  )
  .await
}

#[instrument(name = "handler::resume_order", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id))]
pub async fn resume_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  transition_response(
    app_state,
    auth_user,
    path.into_inner(),
    TransitionAction::Resume,
    "Order resumed successfully",
  )
  .await
}

#[instrument(name = "handler::soft_delete_order", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id))]
pub async fn soft_delete_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  transition_response(
    app_state,
    auth_user,
    path.into_inner(),
    TransitionAction::SoftDelete,
    "Order deleted successfully",
  )
  .await
}

#[instrument(name = "handler::reorder", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id))]
pub async fn reorder_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = run_reorder(app_state.get_ref().clone(), auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Reorder placed successfully",
    "order": order,
  })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_orders_query_defaults_and_all_filter() {
    let user_id = Uuid::new_v4();
    let q = UserOrdersQuery {
      status: Some("all".into()),
      ..Default::default()
    }
    .into_store_query(user_id)
    .unwrap();
    assert_eq!(q.status, None);
    assert_eq!((q.page, q.limit), (1, DEFAULT_PAGE_LIMIT));

    let q = UserOrdersQuery {
      status: Some("shipped".into()),
      page: Some(2),
      limit: Some(5),
    }
    .into_store_query(user_id)
    .unwrap();
    assert_eq!(q.status, Some(OrderStatus::Shipped));
  }

  #[test]
  fn user_orders_query_rejects_unknown_status_and_bad_paging() {
    let user_id = Uuid::new_v4();
    let bad_status = UserOrdersQuery {
      status: Some("lost".into()),
      ..Default::default()
    };
    assert!(matches!(bad_status.into_store_query(user_id), Err(AppError::InvalidStatus(_))));

    let bad_page = UserOrdersQuery {
      page: Some(0),
      ..Default::default()
    };
    assert!(matches!(bad_page.into_store_query(user_id), Err(AppError::Validation(_))));

    let huge_page = UserOrdersQuery {
      page: Some(i64::MAX),
      limit: Some(MAX_PAGE_LIMIT),
      ..Default::default()
    };
    assert!(matches!(huge_page.into_store_query(user_id), Err(AppError::Validation(_))));
  }
}
