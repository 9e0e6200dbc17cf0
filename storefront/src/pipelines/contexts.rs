// storefront/src/pipelines/contexts.rs

//! Data carried through each pipeline. Handlers receive these wrapped in
//! `shopflow::ContextData`.

use crate::inventory::StockChange;
use crate::lifecycle::Transition;
use crate::models::{CartLine, Order, OrderItem, OrderLineRequest, PaymentMethod, ShippingAddress};
use crate::services::gateways::RazorpayOrder;
use crate::services::payment_verification::PaymentOutcome;
use crate::state::AppState;
use uuid::Uuid;

/// Entry point an order was placed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutChannel {
  /// "Buy now": one product, stock taken immediately.
  Direct,
  /// Cart checkout settled on delivery or off-platform (`/place`).
  Place,
  Stripe,
  Razorpay,
}

impl CheckoutChannel {
  pub fn opens_gateway_session(&self) -> bool {
    matches!(self, CheckoutChannel::Stripe | CheckoutChannel::Razorpay)
  }
}

#[derive(Debug, Clone)]
pub enum GatewaySession {
  Stripe { session_id: String, session_url: String },
  Razorpay(RazorpayOrder),
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub channel: CheckoutChannel,
  pub payment_method: PaymentMethod,
  pub lines: Vec<OrderLineRequest>,
  pub shipping_address: ShippingAddress,
  /// Where the gateway sends the shopper back to.
  pub origin: Option<String>,

  pub items: Vec<OrderItem>,
  pub order: Option<Order>,
  pub session: Option<GatewaySession>,
  pub cart_cleared: bool,
}

impl CheckoutCtxData {
  pub fn new(
    app_state: AppState,
    user_id: Uuid,
    channel: CheckoutChannel,
    payment_method: PaymentMethod,
    lines: Vec<OrderLineRequest>,
    shipping_address: ShippingAddress,
  ) -> Self {
    Self {
      app_state,
      user_id,
      channel,
      payment_method,
      lines,
      shipping_address,
      origin: None,
      items: Vec::new(),
      order: None,
      session: None,
      cart_cleared: false,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
  Cancel,
  Resume,
  SoftDelete,
}

#[derive(Clone)]
pub struct OrderTransitionCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub action: TransitionAction,

  pub current: Option<Order>,
  pub planned: Option<Transition>,
  pub updated: Option<Order>,
}

impl OrderTransitionCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, order_id: Uuid, action: TransitionAction) -> Self {
    Self {
      app_state,
      user_id,
      order_id,
      action,
      current: None,
      planned: None,
      updated: None,
    }
  }
}

#[derive(Clone)]
pub struct ReorderCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub source_order_id: Uuid,

  pub source: Option<Order>,
  pub items: Vec<OrderItem>,
  pub stock: Vec<StockChange>,
  pub order: Option<Order>,
}

impl ReorderCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, source_order_id: Uuid) -> Self {
    Self {
      app_state,
      user_id,
      source_order_id,
      source: None,
      items: Vec::new(),
      stock: Vec::new(),
      order: None,
    }
  }
}

/// What the shopper's browser posts back after visiting a gateway.
#[derive(Debug, Clone)]
pub enum GatewayCallback {
  Stripe {
    order_id: Uuid,
    success: bool,
  },
  Razorpay {
    razorpay_order_id: String,
    razorpay_payment_id: String,
    razorpay_signature: String,
  },
}

impl GatewayCallback {
  pub fn gateway(&self) -> PaymentMethod {
    match self {
      GatewayCallback::Stripe { .. } => PaymentMethod::Stripe,
      GatewayCallback::Razorpay { .. } => PaymentMethod::Razorpay,
    }
  }
}

#[derive(Clone)]
pub struct PaymentCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub callback: GatewayCallback,

  pub outcome: Option<PaymentOutcome>,
  pub order: Option<Order>,
}

impl PaymentCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, callback: GatewayCallback) -> Self {
    Self {
      app_state,
      user_id,
      callback,
      outcome: None,
      order: None,
    }
  }

  pub fn succeeded(&self) -> bool {
    self.outcome.as_ref().is_some_and(PaymentOutcome::is_success)
  }
}

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub size: Option<String>,
  pub color: Option<String>,
  pub quantity: i32,

  pub product_name: Option<String>,
  pub stock_available: i32,
  pub updated_cart: Option<Vec<CartLine>>,
}

impl AddToCartCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, line: CartLine) -> Self {
    Self {
      app_state,
      user_id,
      product_id: line.product_id,
      size: line.size,
      color: line.color,
      quantity: line.quantity,
      product_name: None,
      stock_available: 0,
      updated_cart: None,
    }
  }
}
