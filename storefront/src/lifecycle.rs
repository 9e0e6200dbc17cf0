// storefront/src/lifecycle.rs

//! Order state machine over `(status, payment_status)`.
//!
//! Every function here is pure: it takes the current order, checks the guard
//! for the requested move and returns the next order together with the stock
//! changes that must be committed alongside it. Nothing is written until the
//! caller hands the [`Transition`] to the store.
//!
//! [`override_status`] is the administrative escape hatch and skips every
//! guard.

use crate::errors::AppError;
use crate::inventory::{self, StockChange};
use crate::models::{Order, OrderItem, OrderStatus, OrderType, PaymentMethod, PaymentStatus, ShippingAddress};
use chrono::Utc;
use uuid::Uuid;

/// Next order state plus the stock deltas that go with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
  pub order: Order,
  pub stock: Vec<StockChange>,
}

/// Creation-time rule for direct orders, `/place` and reorders: cash on
/// delivery starts unpaid, any other method is recorded as already paid.
pub fn initial_payment_status(method: PaymentMethod) -> PaymentStatus {
  match method {
    PaymentMethod::Cod => PaymentStatus::Pending,
    PaymentMethod::Stripe | PaymentMethod::Razorpay => PaymentStatus::Completed,
  }
}

pub struct NewOrder {
  pub user_id: Uuid,
  pub items: Vec<OrderItem>,
  pub shipping_address: ShippingAddress,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub order_type: OrderType,
  pub delivery_fee: i64,
}

/// Builds a fresh `pending` order. `total_amount` is always derived from the
/// item snapshots.
pub fn new_order(draft: NewOrder) -> Order {
  let now = Utc::now();
  let total_amount = inventory::total_of(&draft.items);
  Order {
    id: Uuid::new_v4(),
    user_id: draft.user_id,
    items: draft.items,
    total_amount,
    delivery_fee: draft.delivery_fee,
    shipping_address: draft.shipping_address,
    status: OrderStatus::Pending,
    payment_method: draft.payment_method,
    payment_status: draft.payment_status,
    payment_ref: None,
    payment_id: None,
    order_type: draft.order_type,
    active: true,
    created_at: now,
    updated_at: now,
  }
}

pub fn cancel(order: &Order) -> Result<Transition, AppError> {
  if matches!(
    order.status,
    OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Cancelled
  ) {
    return Err(AppError::InvalidTransition(format!(
      "Order cannot be cancelled as it is already {}",
      order.status
    )));
  }

  let mut next = touched(order);
  next.status = OrderStatus::Cancelled;
  if next.payment_status == PaymentStatus::Completed {
    next.payment_status = PaymentStatus::Refunded;
  }
  Ok(Transition {
    stock: StockChange::restock(&order.items),
    order: next,
  })
}

/// Stock availability is checked separately against the catalog; the
/// returned decrements are conditional at commit time as well.
pub fn resume(order: &Order) -> Result<Transition, AppError> {
  if order.status != OrderStatus::Cancelled {
    return Err(AppError::InvalidTransition(format!(
      "Order cannot be resumed as it is {}",
      order.status
    )));
  }

  let mut next = touched(order);
  next.status = OrderStatus::Pending;
  if next.payment_status == PaymentStatus::Refunded {
    next.payment_status = PaymentStatus::Pending;
  }
  Ok(Transition {
    stock: StockChange::deduct(&order.items),
    order: next,
  })
}

pub fn soft_delete(order: &Order) -> Result<Transition, AppError> {
  if !order.active {
    return Err(AppError::NotFound("Order not found or already deleted".to_string()));
  }
  if !matches!(order.status, OrderStatus::Delivered | OrderStatus::Cancelled) {
    return Err(AppError::InvalidTransition(format!(
      "Order cannot be deleted as it is {}. Only delivered or cancelled orders can be deleted.",
      order.status
    )));
  }

  let mut next = touched(order);
  next.active = false;
  Ok(Transition {
    order: next,
    stock: Vec::new(),
  })
}

/// Gateway reported success. Both writes are absolute, so replaying a
/// confirmation leaves the order unchanged.
pub fn confirm_payment(order: &Order, payment_id: Option<String>) -> Transition {
  let mut next = touched(order);
  next.payment_status = PaymentStatus::Completed;
  next.status = OrderStatus::Confirmed;
  if payment_id.is_some() {
    next.payment_id = payment_id;
  }
  Transition {
    order: next,
    stock: Vec::new(),
  }
}

/// Gateway reported failure. Gateway orders never took stock at creation, so
/// nothing is given back here.
pub fn fail_payment(order: &Order) -> Transition {
  let mut next = touched(order);
  next.payment_status = PaymentStatus::Failed;
  next.status = OrderStatus::Cancelled;
  Transition {
    order: next,
    stock: Vec::new(),
  }
}

/// Administrative overwrite of `status`. Any status is reachable from any
/// other and the payment track is left alone.
pub fn override_status(order: &Order, target: OrderStatus) -> Transition {
  let mut next = touched(order);
  next.status = target;
  Transition {
    order: next,
    stock: Vec::new(),
  }
}

/// Records the gateway-side reference once a session has been opened.
pub fn attach_payment_ref(order: &Order, payment_ref: String) -> Transition {
  let mut next = touched(order);
  next.payment_ref = Some(payment_ref);
  Transition {
    order: next,
    stock: Vec::new(),
  }
}

fn touched(order: &Order) -> Order {
  let mut next = order.clone();
  next.updated_at = Utc::now();
  next
}
