// storefront/src/pipelines/payment_pipeline.rs

//! Applies a gateway callback to its order.
//!
//! A Razorpay callback with a bad signature stops in the first step with
//! `InvalidSignature`. The order is never loaded and stays untouched. A
//! callback for an order that never opened a session with that gateway is a
//! `Validation` error.

use crate::errors::AppError;
use crate::lifecycle;
use crate::models::Order;
use crate::pipelines::contexts::{GatewayCallback, PaymentCtxData};
use crate::services::payment_verification::{self, PaymentOutcome};
use crate::state::AppState;
use crate::store::{OrderStore, OrderWrite, UserStore};
use shopflow::{ContextData, Pipeline, PipelineControl, PipelineResult, Registry, SkipCondition};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub fn register_payment_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let not_paid: SkipCondition<PaymentCtxData> = Arc::new(|data: &PaymentCtxData| !data.succeeded());

  let mut p = Pipeline::<PaymentCtxData, AppError>::new(&[
    ("verify_gateway_callback", false, None),
    ("load_order_for_payment", false, None),
    ("apply_payment_outcome", false, None),
    ("clear_cart_after_payment", false, Some(not_paid)),
  ]);

  p.on_root("verify_gateway_callback", verify_gateway_callback);
  p.on_root("load_order_for_payment", load_order_for_payment);
  p.on_root("apply_payment_outcome", apply_payment_outcome);
  p.on_root("clear_cart_after_payment", clear_cart_after_payment);

  registry.register_pipeline(p);
  info!("Payment verification pipeline registered.");
}

/// The order after the outcome was applied, and whether the payment went through.
pub async fn run_payment_verification(
  app_state: AppState,
  user_id: Uuid,
  callback: GatewayCallback,
) -> Result<(Order, bool), AppError> {
  let flows = app_state.flows.clone();
  let ctx_data = ContextData::new(PaymentCtxData::new(app_state, user_id, callback));

  match flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx_data.read();
      let order = guard
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Payment verification completed without an order.".to_string()))?;
      Ok((order, guard.succeeded()))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Payment verification was halted.".to_string())),
  }
}

#[instrument(name = "payment::verify_callback", skip(ctx_data), err(Display))]
async fn verify_gateway_callback(ctx_data: ContextData<PaymentCtxData>) -> Result<PipelineControl, AppError> {
  let (state, callback) = ctx_data.with(|d| (d.app_state.clone(), d.callback.clone()));

  let outcome = match callback {
    GatewayCallback::Stripe { success, .. } => payment_verification::stripe_outcome(success),
    GatewayCallback::Razorpay {
      razorpay_order_id,
      razorpay_payment_id,
      razorpay_signature,
    } => {
      payment_verification::razorpay_outcome(
        state.gateways.razorpay.as_ref(),
        &state.config.gateways.razorpay_key_secret,
        &razorpay_order_id,
        &razorpay_payment_id,
        &razorpay_signature,
      )
      .await?
    }
  };

  ctx_data.update(|d| d.outcome = Some(outcome));
  Ok(PipelineControl::Continue)
}

#[instrument(name = "payment::load_order", skip(ctx_data), err(Display))]
async fn load_order_for_payment(ctx_data: ContextData<PaymentCtxData>) -> Result<PipelineControl, AppError> {
  let (store, user_id, callback) = ctx_data.with(|d| (d.app_state.store.clone(), d.user_id, d.callback.clone()));

  let found = match &callback {
    GatewayCallback::Stripe { order_id, .. } => store.order(*order_id).await?,
    GatewayCallback::Razorpay { razorpay_order_id, .. } => store.order_by_payment_ref(razorpay_order_id).await?,
  };
  let order = found.ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  if order.user_id != user_id {
    warn!(order_id = %order.id, %user_id, "Payment callback for another user's order.");
    return Err(AppError::Forbidden("You do not have access to this order".to_string()));
  }
  // Only orders that opened a session with this gateway take its callbacks.
  if order.payment_method != callback.gateway() || order.payment_ref.is_none() {
    warn!(order_id = %order.id, method = ?order.payment_method, gateway = ?callback.gateway(), "Callback from a gateway the order was not placed through.");
    return Err(AppError::Validation(format!(
      "Order {} was not placed through {:?}",
      order.id,
      callback.gateway()
    )));
  }

  ctx_data.update(|d| d.order = Some(order));
  Ok(PipelineControl::Continue)
}

#[instrument(name = "payment::apply_outcome", skip(ctx_data), err(Display))]
async fn apply_payment_outcome(ctx_data: ContextData<PaymentCtxData>) -> Result<PipelineControl, AppError> {
  let (store, outcome, order) = ctx_data.with(|d| (d.app_state.store.clone(), d.outcome.clone(), d.order.clone()));
  let order = order.ok_or_else(|| AppError::Internal("Order was not loaded before applying payment.".to_string()))?;
  let outcome = outcome.ok_or_else(|| AppError::Internal("Payment outcome is missing.".to_string()))?;

  let transition = match &outcome {
    PaymentOutcome::Succeeded { payment_id } => lifecycle::confirm_payment(&order, payment_id.clone()),
    PaymentOutcome::Failed => lifecycle::fail_payment(&order),
  };
  let updated = store
    .commit(OrderWrite::update(&order, transition.order), &transition.stock)
    .await?;
  info!(
    order_id = %updated.id,
    success = outcome.is_success(),
    payment_status = ?updated.payment_status,
    "Payment outcome recorded."
  );

  ctx_data.update(|d| d.order = Some(updated));
  Ok(PipelineControl::Continue)
}

#[instrument(name = "payment::clear_cart", skip(ctx_data), err(Display))]
async fn clear_cart_after_payment(ctx_data: ContextData<PaymentCtxData>) -> Result<PipelineControl, AppError> {
  let (store, user_id) = ctx_data.with(|d| (d.app_state.store.clone(), d.user_id));
  store.save_cart(user_id, &[]).await?;
  Ok(PipelineControl::Continue)
}
