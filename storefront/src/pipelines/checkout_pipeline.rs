// storefront/src/pipelines/checkout_pipeline.rs

//! Order creation for every entry point: direct buy, `/place`, Stripe and
//! Razorpay.
//!
//! Only the direct channel takes stock when the order is recorded. Cart and
//! gateway orders leave stock untouched at creation.

use crate::errors::AppError;
use crate::inventory::{self, StockChange};
use crate::lifecycle::{self, NewOrder};
use crate::models::{Order, OrderType, PaymentStatus};
use crate::pipelines::contexts::{CheckoutChannel, CheckoutCtxData, GatewaySession};
use crate::services::gateways::{CheckoutLine, CheckoutSessionRequest};
use crate::state::AppState;
use crate::store::{CatalogStore, OrderStore, OrderWrite, UserStore};
use shopflow::{ContextData, Pipeline, PipelineControl, PipelineResult, Registry, SkipCondition};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub fn register_checkout_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let no_gateway: SkipCondition<CheckoutCtxData> = Arc::new(|data: &CheckoutCtxData| !data.channel.opens_gateway_session());
  let keeps_cart: SkipCondition<CheckoutCtxData> = Arc::new(|data: &CheckoutCtxData| data.channel != CheckoutChannel::Place);

  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("validate_checkout_request", false, None),
    ("snapshot_catalog_prices", false, None),
    ("persist_order", false, None),
    ("open_gateway_session", false, Some(no_gateway)),
    ("clear_cart_after_checkout", false, Some(keeps_cart)),
  ]);

  p.on_root("validate_checkout_request", validate_checkout_request);
  p.on_root("snapshot_catalog_prices", snapshot_catalog_prices);
  p.on_root("persist_order", persist_order);
  p.on_root("open_gateway_session", open_gateway_session);
  p.on_root("clear_cart_after_checkout", clear_cart_after_checkout);

  registry.register_pipeline(p);
  info!("Checkout pipeline registered.");
}

/// What a finished checkout hands back to the HTTP layer.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
  pub order: Order,
  pub session: Option<GatewaySession>,
}

/// Runs the checkout pipeline and returns the stored order.
pub async fn run_checkout(ctx: CheckoutCtxData) -> Result<CheckoutReceipt, AppError> {
  let flows = ctx.app_state.flows.clone();
  let ctx_data = ContextData::new(ctx);

  match flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx_data.read();
      let order = guard
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Checkout completed without an order record.".to_string()))?;
      Ok(CheckoutReceipt {
        order,
        session: guard.session.clone(),
      })
    }
    PipelineResult::Stopped => Err(AppError::Internal("Checkout was halted before completion.".to_string())),
  }
}

#[instrument(name = "checkout::validate_request", skip(ctx_data), err(Display))]
async fn validate_checkout_request(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (channel, lines, address_check) =
    ctx_data.with(|d| (d.channel, d.lines.clone(), d.shipping_address.validate()));
  address_check?;

  if lines.is_empty() {
    return Err(AppError::Validation("Order must contain at least one item".to_string()));
  }
  if channel == CheckoutChannel::Direct && lines.len() != 1 {
    return Err(AppError::Validation("A direct order holds exactly one product".to_string()));
  }
  if let Some(line) = lines.iter().find(|l| l.quantity < 1) {
    return Err(AppError::Validation(format!(
      "Quantity for product {} must be at least 1",
      line.product_id
    )));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::snapshot_prices", skip(ctx_data), err(Display))]
async fn snapshot_catalog_prices(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (store, channel, lines) = ctx_data.with(|d| (d.app_state.store.clone(), d.channel, d.lines.clone()));

  let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
  let catalog = store.products_by_ids(&ids).await?;
  let items = inventory::snapshot(&lines, &catalog)?;
  if channel == CheckoutChannel::Direct {
    inventory::ensure_available(&items, &catalog)?;
  }

  ctx_data.update(|d| d.items = items);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::persist_order", skip(ctx_data), err(Display))]
async fn persist_order(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (state, user_id, channel, payment_method, items, shipping_address) = ctx_data.with(|d| {
    (
      d.app_state.clone(),
      d.user_id,
      d.channel,
      d.payment_method,
      d.items.clone(),
      d.shipping_address.clone(),
    )
  });

  let payment_status = match channel {
    CheckoutChannel::Direct | CheckoutChannel::Place => lifecycle::initial_payment_status(payment_method),
    CheckoutChannel::Stripe | CheckoutChannel::Razorpay => PaymentStatus::Pending,
  };
  let order_type = match channel {
    CheckoutChannel::Direct => OrderType::Direct,
    _ if items.len() > 1 => OrderType::Cart,
    _ => OrderType::Direct,
  };
  let (delivery_fee, stock) = match channel {
    CheckoutChannel::Direct => (0, StockChange::deduct(&items)),
    _ => (state.config.delivery_fee, Vec::new()),
  };

  let order = lifecycle::new_order(NewOrder {
    user_id,
    items,
    shipping_address,
    payment_method,
    payment_status,
    order_type,
    delivery_fee,
  });
  let stored = state.store.commit(OrderWrite::Insert(order), &stock).await?;
  info!(
    order_id = %stored.id,
    ?channel,
    total_amount = stored.total_amount,
    payment_status = ?stored.payment_status,
    "Order recorded."
  );

  ctx_data.update(|d| d.order = Some(stored));
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::open_gateway_session", skip(ctx_data), err(Display))]
async fn open_gateway_session(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (state, channel, order, origin) =
    ctx_data.with(|d| (d.app_state.clone(), d.channel, d.order.clone(), d.origin.clone()));
  let order = order.ok_or_else(|| AppError::Internal("No order to open a payment session for.".to_string()))?;

  let session = match channel {
    CheckoutChannel::Stripe => {
      let base = origin.unwrap_or_else(|| state.config.app_base_url.clone());
      let mut lines: Vec<CheckoutLine> = order
        .items
        .iter()
        .map(|item| CheckoutLine {
          name: item.name.clone(),
          unit_amount: item.price,
          quantity: item.quantity,
        })
        .collect();
      if order.delivery_fee > 0 {
        lines.push(CheckoutLine {
          name: "Delivery Charges".to_string(),
          unit_amount: order.delivery_fee,
          quantity: 1,
        });
      }
      let request = CheckoutSessionRequest {
        order_id: order.id,
        user_id: order.user_id,
        currency: state.config.currency.clone(),
        lines,
        success_url: format!("{}/verify?success=true&orderId={}", base, order.id),
        cancel_url: format!("{}/verify?success=false&orderId={}", base, order.id),
      };
      let session = state.gateways.stripe.create_checkout_session(&request).await.map_err(|e| {
        warn!(order_id = %order.id, error = %e, "Stripe session could not be opened; order stays pending.");
        e
      })?;
      GatewaySession::Stripe {
        session_id: session.id,
        session_url: session.url,
      }
    }
    CheckoutChannel::Razorpay => {
      let razorpay_order = state
        .gateways
        .razorpay
        .create_order(order.amount_due(), &state.config.currency, &order.id.to_string())
        .await
        .map_err(|e| {
          warn!(order_id = %order.id, error = %e, "Razorpay order could not be created; order stays pending.");
          e
        })?;
      GatewaySession::Razorpay(razorpay_order)
    }
    CheckoutChannel::Direct | CheckoutChannel::Place => return Ok(PipelineControl::Continue),
  };

  let payment_ref = match &session {
    GatewaySession::Stripe { session_id, .. } => session_id.clone(),
    GatewaySession::Razorpay(razorpay_order) => razorpay_order.id.clone(),
  };
  let transition = lifecycle::attach_payment_ref(&order, payment_ref);
  let stored = state
    .store
    .commit(OrderWrite::update(&order, transition.order), &transition.stock)
    .await?;

  ctx_data.update(|d| {
    d.order = Some(stored);
    d.session = Some(session);
  });
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::clear_cart", skip(ctx_data), err(Display))]
async fn clear_cart_after_checkout(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (store, user_id) = ctx_data.with(|d| (d.app_state.store.clone(), d.user_id));
  store.save_cart(user_id, &[]).await?;
  ctx_data.update(|d| d.cart_cleared = true);
  Ok(PipelineControl::Continue)
}
