// storefront/src/web/handlers/payment_handlers.rs

//! Gateway return endpoints. A failed payment is still a 200 with
//! `success: false`; only verification problems are errors.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::GatewayCallback;
use crate::pipelines::payment_pipeline::run_payment_verification;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

/// The storefront posts `success` either as a JSON boolean or as the query
/// string value it was redirected with.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum SuccessFlag {
  Bool(bool),
  Text(String),
}

impl SuccessFlag {
  pub fn is_true(&self) -> bool {
    match self {
      SuccessFlag::Bool(b) => *b,
      SuccessFlag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
    }
  }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyStripeRequest {
  pub order_id: Uuid,
  pub success: SuccessFlag,
}

#[derive(Deserialize, Debug)]
pub struct VerifyRazorpayRequest {
  pub razorpay_order_id: String,
  pub razorpay_payment_id: String,
  pub razorpay_signature: String,
}

async fn verification_response(
  app_state: web::Data<AppState>,
  user_id: Uuid,
  callback: GatewayCallback,
) -> Result<HttpResponse, AppError> {
  let (order, paid) = run_payment_verification(app_state.get_ref().clone(), user_id, callback).await?;
  info!(order_id = %order.id, paid, "Gateway callback applied.");

  if paid {
    Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "message": "Payment Successful",
      "order": order,
    })))
  } else {
    Ok(HttpResponse::Ok().json(json!({
      "success": false,
      "message": "Payment Failed",
      "order": order,
    })))
  }
}

#[instrument(name = "handler::verify_stripe", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id, order_id = %req_payload.order_id))]
pub async fn verify_stripe_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<VerifyStripeRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let callback = GatewayCallback::Stripe {
    order_id: req.order_id,
    success: req.success.is_true(),
  };
  verification_response(app_state, auth_user.user_id, callback).await
}

#[instrument(name = "handler::verify_razorpay", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id, razorpay_order_id = %req_payload.razorpay_order_id))]
pub async fn verify_razorpay_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<VerifyRazorpayRequest>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let callback = GatewayCallback::Razorpay {
    razorpay_order_id: req.razorpay_order_id,
    razorpay_payment_id: req.razorpay_payment_id,
    razorpay_signature: req.razorpay_signature,
  };
  verification_response(app_state, auth_user.user_id, callback).await
}
