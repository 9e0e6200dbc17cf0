// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
  User,
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub product_id: Uuid,
  #[serde(default)]
  pub size: Option<String>,
  #[serde(default)]
  pub color: Option<String>,
  pub quantity: i32,
}

impl CartLine {
  pub fn same_variant(&self, product_id: Uuid, size: &Option<String>, color: &Option<String>) -> bool {
    self.product_id == product_id && &self.size == size && &self.color == color
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub role: UserRole,
  #[sqlx(json)]
  pub cart: Vec<CartLine>,
  pub favorites: Vec<Uuid>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
