// storefront/src/store/mod.rs

//! Persistence seams. `PgStore` backs production, `MemoryStore` backs tests
//! and runs without a database.

pub mod memory;
pub mod postgres;
pub mod seed;

use crate::errors::{AppError, Result};
use crate::inventory::StockChange;
use crate::models::{CartLine, Order, OrderStatus, PaymentStatus, Product, Review, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// The state a transition was planned against. An update only lands while
/// the stored order still matches it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderVersion {
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub active: bool,
  pub updated_at: DateTime<Utc>,
}

impl OrderVersion {
  pub fn of(order: &Order) -> Self {
    Self {
      status: order.status,
      payment_status: order.payment_status,
      active: order.active,
      updated_at: order.updated_at,
    }
  }

  pub fn matches(&self, stored: &Order) -> bool {
    *self == Self::of(stored)
  }
}

/// How an order reaches the store in [`OrderStore::commit`].
#[derive(Debug, Clone)]
pub enum OrderWrite {
  Insert(Order),
  /// Fails with `NotFound` when the order has been removed meanwhile and with
  /// `InvalidTransition` when it no longer matches `expected`. Neither case
  /// applies any stock change.
  Update { order: Order, expected: OrderVersion },
}

impl OrderWrite {
  /// Update of `loaded`, the order as it was read before planning.
  pub fn update(loaded: &Order, planned: Order) -> Self {
    OrderWrite::Update {
      order: planned,
      expected: OrderVersion::of(loaded),
    }
  }

  pub fn order(&self) -> &Order {
    match self {
      OrderWrite::Insert(order) | OrderWrite::Update { order, .. } => order,
    }
  }
}

pub(crate) fn stale_write(current: OrderStatus) -> AppError {
  AppError::InvalidTransition(format!(
    "Order was changed by another request, its status is now {}",
    current.as_str()
  ))
}

/// Row offset of a page, refusing pages whose offset does not fit.
pub(crate) fn page_offset(page: i64, limit: i64) -> Result<i64> {
  (page.max(1) - 1)
    .checked_mul(limit.max(0))
    .ok_or_else(|| AppError::Validation(format!("Page {} is out of range", page)))
}

#[derive(Debug, Clone)]
pub struct UserOrderQuery {
  pub user_id: Uuid,
  pub status: Option<OrderStatus>,
  pub page: i64,
  pub limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: i64,
  pub page: i64,
  pub limit: i64,
}

impl<T> Page<T> {
  pub fn total_pages(&self) -> i64 {
    if self.limit <= 0 {
      return 0;
    }
    (self.total + self.limit - 1) / self.limit
  }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn list_products(&self) -> Result<Vec<Product>>;
  async fn product(&self, id: Uuid) -> Result<Option<Product>>;
  /// Products that no longer exist are simply absent from the map.
  async fn products_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Product>>;
  async fn insert_product(&self, product: &Product) -> Result<()>;
  async fn update_product(&self, product: &Product) -> Result<()>;
  async fn remove_product(&self, id: Uuid) -> Result<bool>;
  async fn set_rating(&self, product_id: Uuid, average: f64, total: i32) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn order(&self, id: Uuid) -> Result<Option<Order>>;
  async fn order_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>>;
  /// Every order, inactive ones included, newest first.
  async fn list_orders(&self) -> Result<Vec<Order>>;
  /// Active orders of one user, newest first.
  async fn user_orders(&self, query: &UserOrderQuery) -> Result<Page<Order>>;
  /// Writes the order and applies `stock` as one unit. Either everything is
  /// visible afterwards or nothing is.
  async fn commit(&self, write: OrderWrite, stock: &[StockChange]) -> Result<Order>;
  async fn delete_order(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
  async fn user(&self, id: Uuid) -> Result<Option<User>>;
  async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
  /// Fails with `Validation` when the email is taken.
  async fn insert_user(&self, user: &User) -> Result<()>;
  async fn save_cart(&self, user_id: Uuid, cart: &[CartLine]) -> Result<()>;
  async fn save_favorites(&self, user_id: Uuid, favorites: &[Uuid]) -> Result<()>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
  async fn review(&self, id: Uuid) -> Result<Option<Review>>;
  async fn reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>>;
  async fn review_by_author(&self, product_id: Uuid, user_id: Uuid) -> Result<Option<Review>>;
  async fn insert_review(&self, review: &Review) -> Result<()>;
  async fn update_review(&self, review: &Review) -> Result<()>;
  async fn delete_review(&self, id: Uuid) -> Result<bool>;
}

pub trait Store: CatalogStore + OrderStore + UserStore + ReviewStore {}

impl<T> Store for T where T: CatalogStore + OrderStore + UserStore + ReviewStore {}
