// storefront/src/models/order.rs

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Processing => "processing",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| AppError::InvalidStatus(s.to_string()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Cod,
  Stripe,
  Razorpay,
}

impl FromStr for PaymentMethod {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "cod" => Ok(PaymentMethod::Cod),
      "stripe" => Ok(PaymentMethod::Stripe),
      "razorpay" => Ok(PaymentMethod::Razorpay),
      other => Err(AppError::Validation(format!("Unsupported payment method '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_type_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
  Cart,
  Direct,
}

/// A purchased line. `price` and `name` are copied from the catalog when the
/// order is created and never follow later catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: Uuid,
  pub quantity: i32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub size: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  pub price: i64,
  pub name: String,
}

impl OrderItem {
  pub fn line_total(&self) -> i64 {
    self.price * i64::from(self.quantity)
  }
}

/// What a client asks for. Prices are never taken from the request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
  #[serde(alias = "product")]
  pub product_id: Uuid,
  pub quantity: i32,
  #[serde(default)]
  pub size: Option<String>,
  #[serde(default)]
  pub color: Option<String>,
}

/// Absent fields deserialize as empty and are reported by [`ShippingAddress::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: String,
  pub street: String,
  pub apartment: Option<String>,
  pub city: String,
  pub state: Option<String>,
  pub zipcode: String,
  pub country: String,
  pub save_address: bool,
}

impl ShippingAddress {
  pub fn validate(&self) -> Result<(), AppError> {
    let required = [
      ("firstName", &self.first_name),
      ("lastName", &self.last_name),
      ("email", &self.email),
      ("phone", &self.phone),
      ("street", &self.street),
      ("city", &self.city),
      ("zipcode", &self.zipcode),
      ("country", &self.country),
    ];
    let missing: Vec<&str> = required
      .iter()
      .filter(|(_, value)| value.trim().is_empty())
      .map(|(field, _)| *field)
      .collect();
    if !missing.is_empty() {
      return Err(AppError::Validation(format!(
        "Shipping address is missing: {}",
        missing.join(", ")
      )));
    }
    if !self.email.contains('@') {
      return Err(AppError::Validation("Shipping email is not valid".to_string()));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  #[sqlx(json)]
  pub items: Vec<OrderItem>,
  /// Sum of `price * quantity` over `items`. Never includes the delivery fee.
  pub total_amount: i64,
  pub delivery_fee: i64,
  #[sqlx(json)]
  pub shipping_address: ShippingAddress,
  pub status: OrderStatus,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  /// Gateway-side reference: Stripe session id or Razorpay order id.
  pub payment_ref: Option<String>,
  pub payment_id: Option<String>,
  pub order_type: OrderType,
  pub active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// Amount a gateway is asked to collect.
  pub fn amount_due(&self) -> i64 {
    self.total_amount + self.delivery_fee
  }
}
