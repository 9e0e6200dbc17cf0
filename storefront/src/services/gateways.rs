// storefront/src/services/gateways.rs

//! Payment gateway clients.
//!
//! Handlers and pipelines only see the [`StripeClient`] and [`RazorpayClient`]
//! traits. The sandbox implementations below stand in for the gateways'
//! HTTP APIs and are what the service runs with unless a real client is
//! injected into [`Gateways`].

use crate::config::GatewayConfig;
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CheckoutLine {
  pub name: String,
  /// Minor units.
  pub unit_amount: i64,
  pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
  pub order_id: Uuid,
  pub user_id: Uuid,
  pub currency: String,
  pub lines: Vec<CheckoutLine>,
  pub success_url: String,
  pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
  pub id: String,
  pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RazorpayOrder {
  pub id: String,
  pub amount: i64,
  pub currency: String,
  pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RazorpayPayment {
  pub id: String,
  /// `captured` once the money has been taken.
  pub status: String,
}

impl RazorpayPayment {
  pub fn is_captured(&self) -> bool {
    self.status == "captured"
  }
}

#[async_trait]
pub trait StripeClient: Send + Sync {
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<CheckoutSession>;
}

#[async_trait]
pub trait RazorpayClient: Send + Sync {
  async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> AppResult<RazorpayOrder>;
  async fn fetch_payment(&self, payment_id: &str) -> AppResult<RazorpayPayment>;
}

/// Gateway clients shared through application state.
#[derive(Clone)]
pub struct Gateways {
  pub stripe: Arc<dyn StripeClient>,
  pub razorpay: Arc<dyn RazorpayClient>,
}

impl Gateways {
  pub fn sandbox(config: &GatewayConfig) -> Self {
    Self {
      stripe: Arc::new(SandboxStripe::new(&config.stripe_secret_key)),
      razorpay: Arc::new(SandboxRazorpay::new(&config.razorpay_key_id)),
    }
  }
}

pub struct SandboxStripe {
  account: String,
}

impl SandboxStripe {
  pub fn new(secret_key: &str) -> Self {
    // Only the key's public prefix is kept for log lines.
    let account = secret_key.chars().take(7).collect();
    Self { account }
  }
}

#[async_trait]
impl StripeClient for SandboxStripe {
  #[instrument(name = "SandboxStripe::create_checkout_session", skip_all, fields(order_id = %request.order_id, account = %self.account))]
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<CheckoutSession> {
    let amount: i64 = request.lines.iter().map(|l| l.unit_amount * i64::from(l.quantity)).sum();
    if amount <= 0 {
      return Err(AppError::Payment("Amount must be greater than zero".to_string()));
    }
    let id = format!("cs_test_{}", Uuid::new_v4().simple());
    info!(session_id = %id, amount, currency = %request.currency, "Sandbox checkout session created.");
    Ok(CheckoutSession {
      url: format!("https://checkout.stripe.com/c/pay/{}", id),
      id,
    })
  }
}

pub struct SandboxRazorpay {
  key_id: String,
}

impl SandboxRazorpay {
  pub fn new(key_id: &str) -> Self {
    Self {
      key_id: key_id.to_string(),
    }
  }
}

#[async_trait]
impl RazorpayClient for SandboxRazorpay {
  #[instrument(name = "SandboxRazorpay::create_order", skip(self), fields(key_id = %self.key_id))]
  async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> AppResult<RazorpayOrder> {
    if amount <= 0 {
      return Err(AppError::Payment("Amount must be greater than zero".to_string()));
    }
    Ok(RazorpayOrder {
      id: format!("order_{}", Uuid::new_v4().simple()),
      amount,
      currency: currency.to_uppercase(),
      receipt: receipt.to_string(),
    })
  }

  /// Payment ids starting with `fail_` come back uncaptured.
  #[instrument(name = "SandboxRazorpay::fetch_payment", skip(self))]
  async fn fetch_payment(&self, payment_id: &str) -> AppResult<RazorpayPayment> {
    let status = if payment_id.starts_with("fail_") { "failed" } else { "captured" };
    Ok(RazorpayPayment {
      id: payment_id.to_string(),
      status: status.to_string(),
    })
  }
}
