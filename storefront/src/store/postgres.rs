// storefront/src/store/postgres.rs

use crate::errors::{AppError, Result};
use crate::inventory::{net_changes, StockChange};
use crate::models::{CartLine, Order, OrderStatus, Product, Review, User};
use crate::store::{
  page_offset, stale_write, CatalogStore, OrderStore, OrderWrite, Page, ReviewStore, UserOrderQuery, UserStore,
};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, name, description, price, original_price, images, category, sub_category, sizes, \
   colors, stock_quantity, bestseller, average_rating, total_ratings, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, items, total_amount, delivery_fee, shipping_address, status, payment_method, \
   payment_status, payment_ref, payment_id, order_type, active, created_at, updated_at";

const USER_COLUMNS: &str = "id, name, email, password_hash, role, cart, favorites, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, product_id, user_id, rating, comment, created_at, updated_at";

/// PostgreSQL store using runtime-checked queries.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  #[instrument(name = "PgStore::migrate", skip(self), err(Display))]
  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    Ok(())
  }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl CatalogStore for PgStore {
  async fn list_products(&self) -> Result<Vec<Product>> {
    let sql = format!("SELECT {} FROM products ORDER BY created_at DESC", PRODUCT_COLUMNS);
    Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
  }

  async fn product(&self, id: Uuid) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn products_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
    let products: Vec<Product> = sqlx::query_as(&sql).bind(ids).fetch_all(&self.pool).await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
  }

  async fn insert_product(&self, product: &Product) -> Result<()> {
    sqlx::query(
      "INSERT INTO products (id, name, description, price, original_price, images, category, sub_category, sizes, \
       colors, stock_quantity, bestseller, average_rating, total_ratings, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.original_price)
    .bind(&product.images)
    .bind(&product.category)
    .bind(&product.sub_category)
    .bind(&product.sizes)
    .bind(&product.colors)
    .bind(product.stock_quantity)
    .bind(product.bestseller)
    .bind(product.average_rating)
    .bind(product.total_ratings)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn update_product(&self, product: &Product) -> Result<()> {
    let result = sqlx::query(
      "UPDATE products SET name = $2, description = $3, price = $4, original_price = $5, images = $6, \
       category = $7, sub_category = $8, sizes = $9, colors = $10, stock_quantity = $11, bestseller = $12, \
       updated_at = NOW() WHERE id = $1",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.original_price)
    .bind(&product.images)
    .bind(&product.category)
    .bind(&product.sub_category)
    .bind(&product.sizes)
    .bind(&product.colors)
    .bind(product.stock_quantity)
    .bind(product.bestseller)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound("Product not found".to_string()));
    }
    Ok(())
  }

  async fn remove_product(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn set_rating(&self, product_id: Uuid, average: f64, total: i32) -> Result<()> {
    sqlx::query("UPDATE products SET average_rating = $2, total_ratings = $3, updated_at = NOW() WHERE id = $1")
      .bind(product_id)
      .bind(average)
      .bind(total)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn order(&self, id: Uuid) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn order_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE payment_ref = $1", ORDER_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(payment_ref).fetch_optional(&self.pool).await?)
  }

  async fn list_orders(&self) -> Result<Vec<Order>> {
    let sql = format!("SELECT {} FROM orders ORDER BY created_at DESC", ORDER_COLUMNS);
    Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
  }

  async fn user_orders(&self, query: &UserOrderQuery) -> Result<Page<Order>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE user_id = $1 AND active = TRUE AND ($2::order_status_enum IS NULL OR status = $2) \
       ORDER BY created_at DESC LIMIT $3 OFFSET $4",
      ORDER_COLUMNS
    );
    let offset = page_offset(query.page, query.limit)?;
    let items: Vec<Order> = sqlx::query_as(&sql)
      .bind(query.user_id)
      .bind(query.status)
      .bind(query.limit)
      .bind(offset)
      .fetch_all(&self.pool)
      .await?;
    let total: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND active = TRUE \
       AND ($2::order_status_enum IS NULL OR status = $2)",
    )
    .bind(query.user_id)
    .bind(query.status)
    .fetch_one(&self.pool)
    .await?;
    Ok(Page {
      items,
      total,
      page: query.page,
      limit: query.limit,
    })
  }

  #[instrument(name = "PgStore::commit", skip_all, fields(order_id = %write.order().id, changes = stock.len()), err(Display))]
  async fn commit(&self, write: OrderWrite, stock: &[StockChange]) -> Result<Order> {
    // Dropping `tx` on an early return rolls everything back. The order row is
    // written first so a stale update never reaches the stock table.
    let mut tx = self.pool.begin().await?;

    let stored: Option<Order> = match &write {
      OrderWrite::Insert(order) => {
        let sql = format!(
          "INSERT INTO orders (id, user_id, items, total_amount, delivery_fee, shipping_address, status, \
           payment_method, payment_status, payment_ref, payment_id, order_type, active, created_at, updated_at) \
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING {}",
          ORDER_COLUMNS
        );
        sqlx::query_as(&sql)
          .bind(order.id)
          .bind(order.user_id)
          .bind(Json(&order.items))
          .bind(order.total_amount)
          .bind(order.delivery_fee)
          .bind(Json(&order.shipping_address))
          .bind(order.status)
          .bind(order.payment_method)
          .bind(order.payment_status)
          .bind(&order.payment_ref)
          .bind(&order.payment_id)
          .bind(order.order_type)
          .bind(order.active)
          .bind(order.created_at)
          .bind(order.updated_at)
          .fetch_optional(&mut *tx)
          .await?
      }
      OrderWrite::Update { order, expected } => {
        let sql = format!(
          "UPDATE orders SET items = $2, total_amount = $3, delivery_fee = $4, shipping_address = $5, status = $6, \
           payment_method = $7, payment_status = $8, payment_ref = $9, payment_id = $10, order_type = $11, \
           active = $12, updated_at = NOW() \
           WHERE id = $1 AND status = $13 AND payment_status = $14 AND active = $15 AND updated_at = $16 RETURNING {}",
          ORDER_COLUMNS
        );
        sqlx::query_as(&sql)
          .bind(order.id)
          .bind(Json(&order.items))
          .bind(order.total_amount)
          .bind(order.delivery_fee)
          .bind(Json(&order.shipping_address))
          .bind(order.status)
          .bind(order.payment_method)
          .bind(order.payment_status)
          .bind(&order.payment_ref)
          .bind(&order.payment_id)
          .bind(order.order_type)
          .bind(order.active)
          .bind(expected.status)
          .bind(expected.payment_status)
          .bind(expected.active)
          .bind(expected.updated_at)
          .fetch_optional(&mut *tx)
          .await?
      }
    };

    let stored = match (stored, &write) {
      (Some(stored), _) => stored,
      (None, OrderWrite::Update { order, expected }) => {
        let current: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
          .bind(order.id)
          .fetch_optional(&mut *tx)
          .await?;
        return Err(match current {
          None => AppError::NotFound("Order not found".to_string()),
          Some(current) => {
            warn!(order_id = %order.id, expected = %expected.status.as_str(), current = %current.as_str(), "Stale order write refused.");
            stale_write(current)
          }
        });
      }
      (None, OrderWrite::Insert(_)) => return Err(AppError::Internal("Order insert returned no row".to_string())),
    };

    for change in net_changes(stock) {
      if change.delta < 0 {
        let requested = -change.delta;
        let remaining: Option<i32> = sqlx::query_scalar(
          "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() \
           WHERE id = $1 AND stock_quantity >= $2 RETURNING stock_quantity",
        )
        .bind(change.product_id)
        .bind(requested)
        .fetch_optional(&mut *tx)
        .await?;

        if remaining.is_none() {
          let available: Option<i32> = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
            .bind(change.product_id)
            .fetch_optional(&mut *tx)
            .await?;
          warn!(product_id = %change.product_id, ?available, requested, "Conditional decrement refused.");
          return Err(match available {
            None => AppError::ProductUnavailable(change.product_name),
            Some(available) => AppError::InsufficientStock {
              product: change.product_name,
              available,
            },
          });
        }
      } else {
        let result = sqlx::query(
          "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(change.product_id)
        .bind(change.delta)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
          debug!(product_id = %change.product_id, "Skipping restock of a removed product.");
        }
      }
    }

    tx.commit().await.map_err(|e| {
      error!(error = %e, order_id = %stored.id, "Commit failed.");
      AppError::Sqlx(e)
    })?;
    Ok(stored)
  }

  async fn delete_order(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}

#[async_trait]
impl UserStore for PgStore {
  async fn user(&self, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE lower(email) = lower($1)", USER_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(email).fetch_optional(&self.pool).await?)
  }

  async fn insert_user(&self, user: &User) -> Result<()> {
    sqlx::query(
      "INSERT INTO users (id, name, email, password_hash, role, cart, favorites, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(Json(&user.cart))
    .bind(&user.favorites)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        AppError::Validation("User already exists".to_string())
      } else {
        AppError::Sqlx(e)
      }
    })?;
    Ok(())
  }

  async fn save_cart(&self, user_id: Uuid, cart: &[CartLine]) -> Result<()> {
    let result = sqlx::query("UPDATE users SET cart = $2, updated_at = NOW() WHERE id = $1")
      .bind(user_id)
      .bind(Json(cart))
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
  }

  async fn save_favorites(&self, user_id: Uuid, favorites: &[Uuid]) -> Result<()> {
    let result = sqlx::query("UPDATE users SET favorites = $2, updated_at = NOW() WHERE id = $1")
      .bind(user_id)
      .bind(favorites)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
  }
}

#[async_trait]
impl ReviewStore for PgStore {
  async fn review(&self, id: Uuid) -> Result<Option<Review>> {
    let sql = format!("SELECT {} FROM reviews WHERE id = $1", REVIEW_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>> {
    let sql = format!(
      "SELECT {} FROM reviews WHERE product_id = $1 ORDER BY created_at DESC",
      REVIEW_COLUMNS
    );
    Ok(sqlx::query_as(&sql).bind(product_id).fetch_all(&self.pool).await?)
  }

  async fn review_by_author(&self, product_id: Uuid, user_id: Uuid) -> Result<Option<Review>> {
    let sql = format!(
      "SELECT {} FROM reviews WHERE product_id = $1 AND user_id = $2",
      REVIEW_COLUMNS
    );
    Ok(
      sqlx::query_as(&sql)
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn insert_review(&self, review: &Review) -> Result<()> {
    sqlx::query(
      "INSERT INTO reviews (id, product_id, user_id, rating, comment, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(review.id)
    .bind(review.product_id)
    .bind(review.user_id)
    .bind(review.rating)
    .bind(&review.comment)
    .bind(review.created_at)
    .bind(review.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        AppError::Validation("You have already reviewed this product".to_string())
      } else {
        AppError::Sqlx(e)
      }
    })?;
    Ok(())
  }

  async fn update_review(&self, review: &Review) -> Result<()> {
    let result = sqlx::query("UPDATE reviews SET rating = $2, comment = $3, updated_at = NOW() WHERE id = $1")
      .bind(review.id)
      .bind(review.rating)
      .bind(&review.comment)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound("Review not found".to_string()));
    }
    Ok(())
  }

  async fn delete_review(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}
