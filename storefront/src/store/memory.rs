// storefront/src/store/memory.rs

use crate::errors::{AppError, Result};
use crate::inventory::{net_changes, StockChange};
use crate::models::{CartLine, Order, Product, Review, User};
use crate::store::{
  page_offset, stale_write, CatalogStore, OrderStore, OrderWrite, Page, ReviewStore, UserOrderQuery, UserStore,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  products: Vec<Product>,
  // Insertion order; newest-first listings walk it backwards.
  orders: Vec<Order>,
  users: Vec<User>,
  reviews: Vec<Review>,
}

/// Store kept in process memory. One mutex guards all tables, so a
/// [`OrderStore::commit`] is atomic with respect to every other call.
#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn list_products(&self) -> Result<Vec<Product>> {
    Ok(self.tables.lock().products.clone())
  }

  async fn product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.iter().find(|p| p.id == id).cloned())
  }

  async fn products_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Product>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .products
        .iter()
        .filter(|p| ids.contains(&p.id))
        .map(|p| (p.id, p.clone()))
        .collect(),
    )
  }

  async fn insert_product(&self, product: &Product) -> Result<()> {
    self.tables.lock().products.push(product.clone());
    Ok(())
  }

  async fn update_product(&self, product: &Product) -> Result<()> {
    let mut tables = self.tables.lock();
    let slot = tables
      .products
      .iter_mut()
      .find(|p| p.id == product.id)
      .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    *slot = product.clone();
    Ok(())
  }

  async fn remove_product(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    let before = tables.products.len();
    tables.products.retain(|p| p.id != id);
    Ok(tables.products.len() != before)
  }

  async fn set_rating(&self, product_id: Uuid, average: f64, total: i32) -> Result<()> {
    let mut tables = self.tables.lock();
    if let Some(product) = tables.products.iter_mut().find(|p| p.id == product_id) {
      product.average_rating = average;
      product.total_ratings = total;
      product.updated_at = Utc::now();
    }
    Ok(())
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn order(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.tables.lock().orders.iter().find(|o| o.id == id).cloned())
  }

  async fn order_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .orders
        .iter()
        .find(|o| o.payment_ref.as_deref() == Some(payment_ref))
        .cloned(),
    )
  }

  async fn list_orders(&self) -> Result<Vec<Order>> {
    Ok(self.tables.lock().orders.iter().rev().cloned().collect())
  }

  async fn user_orders(&self, query: &UserOrderQuery) -> Result<Page<Order>> {
    let offset = usize::try_from(page_offset(query.page, query.limit)?).unwrap_or(usize::MAX);
    let tables = self.tables.lock();
    let matching: Vec<&Order> = tables
      .orders
      .iter()
      .rev()
      .filter(|o| o.user_id == query.user_id && o.active)
      .filter(|o| query.status.map_or(true, |s| o.status == s))
      .collect();
    Ok(Page {
      total: matching.len() as i64,
      items: matching
        .into_iter()
        .skip(offset)
        .take(usize::try_from(query.limit).unwrap_or(0))
        .cloned()
        .collect(),
      page: query.page,
      limit: query.limit,
    })
  }

  #[instrument(name = "MemoryStore::commit", skip_all, fields(order_id = %write.order().id, changes = stock.len()), err(Display))]
  async fn commit(&self, write: OrderWrite, stock: &[StockChange]) -> Result<Order> {
    let mut tables = self.tables.lock();
    let changes = net_changes(stock);

    // Check every guard before touching anything.
    let update_index = match &write {
      OrderWrite::Insert(_) => None,
      OrderWrite::Update { order, expected } => {
        let index = tables
          .orders
          .iter()
          .position(|o| o.id == order.id)
          .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        let current = &tables.orders[index];
        if !expected.matches(current) {
          warn!(order_id = %order.id, expected = %expected.status.as_str(), current = %current.status.as_str(), "Stale order write refused.");
          return Err(stale_write(current.status));
        }
        Some(index)
      }
    };

    for change in changes.iter().filter(|c| c.delta < 0) {
      match tables.products.iter().find(|p| p.id == change.product_id) {
        None => return Err(AppError::ProductUnavailable(change.product_name.clone())),
        Some(product) if product.stock_quantity < -change.delta => {
          warn!(product_id = %change.product_id, available = product.stock_quantity, requested = -change.delta, "Conditional decrement refused.");
          return Err(AppError::InsufficientStock {
            product: change.product_name.clone(),
            available: product.stock_quantity,
          });
        }
        Some(_) => {}
      }
    }

    let now = Utc::now();
    for change in &changes {
      match tables.products.iter_mut().find(|p| p.id == change.product_id) {
        Some(product) => {
          product.stock_quantity += change.delta;
          product.updated_at = now;
        }
        None => debug!(product_id = %change.product_id, "Skipping restock of a removed product."),
      }
    }

    let stored = match (write, update_index) {
      (OrderWrite::Update { mut order, .. }, Some(index)) => {
        order.updated_at = now;
        tables.orders[index] = order.clone();
        order
      }
      (OrderWrite::Insert(order), _) | (OrderWrite::Update { order, .. }, None) => {
        tables.orders.push(order.clone());
        order
      }
    };
    Ok(stored)
  }

  async fn delete_order(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    let before = tables.orders.len();
    tables.orders.retain(|o| o.id != id);
    Ok(tables.orders.len() != before)
  }
}

#[async_trait]
impl UserStore for MemoryStore {
  async fn user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.tables.lock().users.iter().find(|u| u.id == id).cloned())
  }

  async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
    let tables = self.tables.lock();
    Ok(tables.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
  }

  async fn insert_user(&self, user: &User) -> Result<()> {
    let mut tables = self.tables.lock();
    if tables.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
      return Err(AppError::Validation("User already exists".to_string()));
    }
    tables.users.push(user.clone());
    Ok(())
  }

  async fn save_cart(&self, user_id: Uuid, cart: &[CartLine]) -> Result<()> {
    let mut tables = self.tables.lock();
    let user = tables
      .users
      .iter_mut()
      .find(|u| u.id == user_id)
      .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    user.cart = cart.to_vec();
    user.updated_at = Utc::now();
    Ok(())
  }

  async fn save_favorites(&self, user_id: Uuid, favorites: &[Uuid]) -> Result<()> {
    let mut tables = self.tables.lock();
    let user = tables
      .users
      .iter_mut()
      .find(|u| u.id == user_id)
      .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    user.favorites = favorites.to_vec();
    user.updated_at = Utc::now();
    Ok(())
  }
}

#[async_trait]
impl ReviewStore for MemoryStore {
  async fn review(&self, id: Uuid) -> Result<Option<Review>> {
    Ok(self.tables.lock().reviews.iter().find(|r| r.id == id).cloned())
  }

  async fn reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>> {
    let tables = self.tables.lock();
    Ok(tables.reviews.iter().filter(|r| r.product_id == product_id).cloned().collect())
  }

  async fn review_by_author(&self, product_id: Uuid, user_id: Uuid) -> Result<Option<Review>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .reviews
        .iter()
        .find(|r| r.product_id == product_id && r.user_id == user_id)
        .cloned(),
    )
  }

  async fn insert_review(&self, review: &Review) -> Result<()> {
    let mut tables = self.tables.lock();
    if tables
      .reviews
      .iter()
      .any(|r| r.product_id == review.product_id && r.user_id == review.user_id)
    {
      return Err(AppError::Validation("You have already reviewed this product".to_string()));
    }
    tables.reviews.push(review.clone());
    Ok(())
  }

  async fn update_review(&self, review: &Review) -> Result<()> {
    let mut tables = self.tables.lock();
    let slot = tables
      .reviews
      .iter_mut()
      .find(|r| r.id == review.id)
      .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
    *slot = review.clone();
    Ok(())
  }

  async fn delete_review(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    let before = tables.reviews.len();
    tables.reviews.retain(|r| r.id != id);
    Ok(tables.reviews.len() != before)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lifecycle::{self, NewOrder};
  use crate::models::{OrderItem, OrderType, PaymentMethod, PaymentStatus, ShippingAddress};

  fn product(name: &str, stock: i32) -> Product {
    Product {
      id: Uuid::new_v4(),
      name: name.to_string(),
      description: String::new(),
      price: 1000,
      original_price: None,
      images: vec![],
      category: "Women".into(),
      sub_category: "Winterwear".into(),
      sizes: vec![],
      colors: vec![],
      stock_quantity: stock,
      bestseller: false,
      average_rating: 0.0,
      total_ratings: 0,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn order_for(items: Vec<OrderItem>) -> Order {
    lifecycle::new_order(NewOrder {
      user_id: Uuid::new_v4(),
      items,
      shipping_address: ShippingAddress {
        first_name: "Asha".into(),
        last_name: "Rao".into(),
        email: "asha@example.com".into(),
        phone: "9000000000".into(),
        street: "12 MG Road".into(),
        apartment: None,
        city: "Pune".into(),
        state: None,
        zipcode: "411001".into(),
        country: "India".into(),
        save_address: false,
      },
      payment_method: PaymentMethod::Cod,
      payment_status: PaymentStatus::Pending,
      order_type: OrderType::Direct,
      delivery_fee: 0,
    })
  }

  fn line(p: &Product, quantity: i32) -> OrderItem {
    OrderItem {
      product_id: p.id,
      quantity,
      size: None,
      color: None,
      price: p.price,
      name: p.name.clone(),
    }
  }

  #[tokio::test]
  async fn refused_decrement_writes_nothing() {
    let store = MemoryStore::new();
    let coat = product("Coat", 5);
    let scarf = product("Scarf", 1);
    store.insert_product(&coat).await.unwrap();
    store.insert_product(&scarf).await.unwrap();

    let items = vec![line(&coat, 2), line(&scarf, 2)];
    let order = order_for(items.clone());
    let err = store
      .commit(OrderWrite::Insert(order), &StockChange::deduct(&items))
      .await
      .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { available: 1, .. }));
    assert_eq!(store.product(coat.id).await.unwrap().unwrap().stock_quantity, 5);
    assert!(store.list_orders().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn restock_skips_removed_products() {
    let store = MemoryStore::new();
    let coat = product("Coat", 3);
    let gone = product("Gone", 0);
    store.insert_product(&coat).await.unwrap();

    let items = vec![line(&coat, 1), line(&gone, 4)];
    let order = order_for(items.clone());
    let stored = store
      .commit(OrderWrite::Insert(order), &StockChange::restock(&items))
      .await
      .unwrap();

    assert_eq!(store.product(coat.id).await.unwrap().unwrap().stock_quantity, 4);
    assert_eq!(store.order(stored.id).await.unwrap(), Some(stored));
  }

  #[tokio::test]
  async fn update_of_deleted_order_is_not_found() {
    let store = MemoryStore::new();
    let order = order_for(vec![]);
    let stored = store.commit(OrderWrite::Insert(order), &[]).await.unwrap();
    assert!(store.delete_order(stored.id).await.unwrap());

    let err = store.commit(OrderWrite::update(&stored, stored.clone()), &[]).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
  }

  #[tokio::test]
  async fn second_cancel_planned_from_same_read_is_refused() {
    let store = MemoryStore::new();
    let coat = product("Coat", 5);
    store.insert_product(&coat).await.unwrap();
    let items = vec![line(&coat, 3)];
    let loaded = store
      .commit(OrderWrite::Insert(order_for(items.clone())), &StockChange::deduct(&items))
      .await
      .unwrap();

    let first = lifecycle::cancel(&loaded).unwrap();
    let second = lifecycle::cancel(&loaded).unwrap();
    store
      .commit(OrderWrite::update(&loaded, first.order), &first.stock)
      .await
      .unwrap();
    let err = store
      .commit(OrderWrite::update(&loaded, second.order), &second.stock)
      .await
      .unwrap_err();

    match err {
      AppError::InvalidTransition(msg) => assert!(msg.contains("cancelled"), "{}", msg),
      other => panic!("expected a stale write, got {other:?}"),
    }
    assert_eq!(store.product(coat.id).await.unwrap().unwrap().stock_quantity, 5);
  }

  #[tokio::test]
  async fn out_of_range_page_is_a_validation_error() {
    let store = MemoryStore::new();
    let query = UserOrderQuery {
      user_id: Uuid::new_v4(),
      status: None,
      page: i64::MAX,
      limit: 100,
    };
    assert!(matches!(store.user_orders(&query).await, Err(AppError::Validation(_))));

    let last_page = UserOrderQuery { page: 3, ..query };
    let page = store.user_orders(&last_page).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
  }

  #[tokio::test]
  async fn duplicate_email_is_rejected() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let user = User {
      id: Uuid::new_v4(),
      name: "Asha".into(),
      email: "asha@example.com".into(),
      password_hash: "x".into(),
      role: crate::models::UserRole::User,
      cart: vec![],
      favorites: vec![],
      created_at: now,
      updated_at: now,
    };
    store.insert_user(&user).await.unwrap();
    let twin = User {
      id: Uuid::new_v4(),
      email: "ASHA@example.com".into(),
      ..user
    };
    assert!(matches!(store.insert_user(&twin).await, Err(AppError::Validation(_))));
  }
}
