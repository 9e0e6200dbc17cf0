// tests/common/mod.rs
#![allow(dead_code)]

use chrono::Utc;
use once_cell::sync::Lazy;
use std::sync::Arc;
use storefront::config::{AppConfig, GatewayConfig};
use storefront::models::{NewProduct, OrderLineRequest, PaymentMethod, Product, ShippingAddress, User, UserRole};
use storefront::pipelines::checkout_pipeline::{run_checkout, CheckoutReceipt};
use storefront::pipelines::contexts::{CheckoutChannel, CheckoutCtxData};
use storefront::services::auth_service;
use storefront::services::gateways::Gateways;
use storefront::state::AppState;
use storefront::store::{CatalogStore, MemoryStore, UserStore};
use tracing::Level;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const RAZORPAY_SECRET: &str = "rzp_test_secret";
pub const DELIVERY_FEE: i64 = 5000;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".into(),
    server_port: 0,
    database_url: None,
    run_migrations: false,
    app_base_url: "http://shop.test".into(),
    jwt_secret: JWT_SECRET.into(),
    jwt_expiration_minutes: 60,
    currency: "inr".into(),
    delivery_fee: DELIVERY_FEE,
    gateways: GatewayConfig {
      stripe_secret_key: "sk_test_dummy".into(),
      razorpay_key_id: "rzp_test_key".into(),
      razorpay_key_secret: RAZORPAY_SECRET.into(),
    },
    seed_db: false,
    seed_admin_email: None,
    seed_admin_password: None,
  }
}

/// Fresh state on an empty in-memory store.
pub fn test_state() -> AppState {
  setup_tracing();
  let config = Arc::new(test_config());
  let gateways = Gateways::sandbox(&config.gateways);
  AppState::new(Arc::new(MemoryStore::new()), config, gateways)
}

pub async fn add_product(state: &AppState, name: &str, price: i64, stock: i32) -> Product {
  let product = NewProduct {
    name: name.to_string(),
    description: format!("{} for tests", name),
    price,
    original_price: None,
    images: vec![],
    category: "Men".into(),
    sub_category: "Topwear".into(),
    sizes: vec!["M".into(), "L".into()],
    colors: vec![],
    stock_quantity: stock,
    bestseller: false,
  }
  .into_product()
  .unwrap();
  state.store.insert_product(&product).await.unwrap();
  product
}

pub async fn add_user(state: &AppState, email: &str, role: UserRole) -> User {
  let now = Utc::now();
  let user = User {
    id: Uuid::new_v4(),
    name: "Test Shopper".into(),
    email: email.to_string(),
    password_hash: auth_service::hash_password("password123").unwrap(),
    role,
    cart: vec![],
    favorites: vec![],
    created_at: now,
    updated_at: now,
  };
  state.store.insert_user(&user).await.unwrap();
  user
}

pub fn token_for(user: &User) -> String {
  auth_service::issue_token(user, JWT_SECRET, 60).unwrap()
}

pub async fn stock_of(state: &AppState, product_id: Uuid) -> i32 {
  state.store.product(product_id).await.unwrap().unwrap().stock_quantity
}

pub fn address() -> ShippingAddress {
  ShippingAddress {
    first_name: "Asha".into(),
    last_name: "Rao".into(),
    email: "asha@example.com".into(),
    phone: "9999999999".into(),
    street: "12 MG Road".into(),
    apartment: None,
    city: "Bengaluru".into(),
    state: Some("KA".into()),
    zipcode: "560001".into(),
    country: "India".into(),
    save_address: false,
  }
}

pub fn line(product: &Product, quantity: i32) -> OrderLineRequest {
  OrderLineRequest {
    product_id: product.id,
    quantity,
    size: Some("M".into()),
    color: None,
  }
}

pub async fn checkout(
  state: &AppState,
  user_id: Uuid,
  channel: CheckoutChannel,
  method: PaymentMethod,
  lines: Vec<OrderLineRequest>,
) -> Result<CheckoutReceipt, storefront::errors::AppError> {
  run_checkout(CheckoutCtxData::new(state.clone(), user_id, channel, method, lines, address())).await
}
