// storefront/src/models/product.rs

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub price: i64,
  pub original_price: Option<i64>,
  pub images: Vec<String>,
  pub category: String,
  pub sub_category: String,
  pub sizes: Vec<String>,
  pub colors: Vec<String>,
  pub stock_quantity: i32,
  pub bestseller: bool,
  pub average_rating: f64,
  pub total_ratings: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
  pub name: String,
  pub description: String,
  pub price: i64,
  #[serde(default)]
  pub original_price: Option<i64>,
  #[serde(default)]
  pub images: Vec<String>,
  pub category: String,
  pub sub_category: String,
  #[serde(default)]
  pub sizes: Vec<String>,
  #[serde(default)]
  pub colors: Vec<String>,
  #[serde(default)]
  pub stock_quantity: i32,
  #[serde(default)]
  pub bestseller: bool,
}

impl NewProduct {
  pub fn into_product(self) -> Result<Product, AppError> {
    if self.name.trim().is_empty() {
      return Err(AppError::Validation("Product name is required".to_string()));
    }
    if self.price < 0 {
      return Err(AppError::Validation("Price cannot be negative".to_string()));
    }
    if self.stock_quantity < 0 {
      return Err(AppError::Validation("Stock quantity cannot be negative".to_string()));
    }
    let now = Utc::now();
    Ok(Product {
      id: Uuid::new_v4(),
      name: self.name,
      description: self.description,
      price: self.price,
      original_price: self.original_price,
      images: self.images,
      category: self.category,
      sub_category: self.sub_category,
      sizes: self.sizes,
      colors: self.colors,
      stock_quantity: self.stock_quantity,
      bestseller: self.bestseller,
      average_rating: 0.0,
      total_ratings: 0,
      created_at: now,
      updated_at: now,
    })
  }
}

/// Partial update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<i64>,
  pub original_price: Option<i64>,
  pub images: Option<Vec<String>>,
  pub category: Option<String>,
  pub sub_category: Option<String>,
  pub sizes: Option<Vec<String>>,
  pub colors: Option<Vec<String>>,
  pub stock_quantity: Option<i32>,
  pub bestseller: Option<bool>,
}

impl ProductPatch {
  pub fn apply(self, product: &mut Product) -> Result<(), AppError> {
    if matches!(self.price, Some(p) if p < 0) {
      return Err(AppError::Validation("Price cannot be negative".to_string()));
    }
    if matches!(self.stock_quantity, Some(q) if q < 0) {
      return Err(AppError::Validation("Stock quantity cannot be negative".to_string()));
    }

    if let Some(name) = self.name.filter(|n| !n.trim().is_empty()) {
      product.name = name;
    }
    if let Some(description) = self.description.filter(|d| !d.trim().is_empty()) {
      product.description = description;
    }
    if let Some(price) = self.price {
      product.price = price;
    }
    if self.original_price.is_some() {
      product.original_price = self.original_price;
    }
    if let Some(images) = self.images {
      product.images = images;
    }
    if let Some(category) = self.category {
      product.category = category;
    }
    if let Some(sub_category) = self.sub_category {
      product.sub_category = sub_category;
    }
    if let Some(sizes) = self.sizes {
      product.sizes = sizes;
    }
    if let Some(colors) = self.colors {
      product.colors = colors;
    }
    if let Some(stock_quantity) = self.stock_quantity {
      product.stock_quantity = stock_quantity;
    }
    if let Some(bestseller) = self.bestseller {
      product.bestseller = bestseller;
    }
    product.updated_at = Utc::now();
    Ok(())
  }
}
