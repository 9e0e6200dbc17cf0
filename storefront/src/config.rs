// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

/// Credentials for the payment gateways, built once at start-up.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
  pub stripe_secret_key: String,
  pub razorpay_key_id: String,
  pub razorpay_key_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs the service on the in-memory store.
  pub database_url: Option<String>,
  pub run_migrations: bool,
  pub app_base_url: String,

  pub jwt_secret: String,
  pub jwt_expiration_minutes: i64,

  pub currency: String,
  /// Surcharge in minor units added on cart checkouts.
  pub delivery_fee: i64,
  pub gateways: GatewayConfig,

  pub seed_db: bool,
  pub seed_admin_email: Option<String>,
  pub seed_admin_password: Option<String>,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "4000".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
    let run_migrations = get_env("RUN_MIGRATIONS")
      .unwrap_or_else(|_| "true".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid RUN_MIGRATIONS value: {}", e)))?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let jwt_secret = get_env("JWT_SECRET")?;
    let jwt_expiration_minutes = get_env("JWT_EXPIRATION_MINUTES")
      .unwrap_or_else(|_| "1440".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid JWT_EXPIRATION_MINUTES: {}", e)))?;

    let currency = get_env("CURRENCY").unwrap_or_else(|_| "inr".to_string()).to_lowercase();
    let delivery_fee = get_env("DELIVERY_FEE")
      .unwrap_or_else(|_| "5000".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid DELIVERY_FEE: {}", e)))?;
    if delivery_fee < 0 {
      return Err(AppError::Config("DELIVERY_FEE cannot be negative".to_string()));
    }

    let gateways = GatewayConfig {
      stripe_secret_key: get_env("STRIPE_SECRET_KEY")?,
      razorpay_key_id: get_env("RAZORPAY_KEY_ID")?,
      razorpay_key_secret: get_env("RAZORPAY_KEY_SECRET")?,
    };

    let seed_db = get_env("SEED_DB")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;
    let seed_admin_email = get_env("SEED_ADMIN_EMAIL").ok();
    let seed_admin_password = get_env("SEED_ADMIN_PASSWORD").ok();

    tracing::info!(
      in_memory = database_url.is_none(),
      currency = %currency,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      run_migrations,
      app_base_url,
      jwt_secret,
      jwt_expiration_minutes,
      currency,
      delivery_fee,
      gateways,
      seed_db,
      seed_admin_email,
      seed_admin_password,
    })
  }
}
