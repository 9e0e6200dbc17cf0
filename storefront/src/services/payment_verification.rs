// storefront/src/services/payment_verification.rs

//! Turns gateway callbacks into a [`PaymentOutcome`].
//!
//! A bad Razorpay signature is reported as [`AppError::InvalidSignature`],
//! which is not a payment outcome at all: callers must stop before touching
//! the order.

use crate::errors::AppError;
use crate::services::gateways::RazorpayClient;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{instrument, warn};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
  Succeeded { payment_id: Option<String> },
  Failed,
}

impl PaymentOutcome {
  pub fn is_success(&self) -> bool {
    matches!(self, PaymentOutcome::Succeeded { .. })
  }
}

/// The redirect-based gateway reports the result through the client, and the
/// flag is taken as given.
pub fn stripe_outcome(success: bool) -> PaymentOutcome {
  if success {
    PaymentOutcome::Succeeded { payment_id: None }
  } else {
    PaymentOutcome::Failed
  }
}

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"`.
pub fn razorpay_signature(key_secret: &str, order_id: &str, payment_id: &str) -> Result<String, AppError> {
  let mut mac = HmacSha256::new_from_slice(key_secret.as_bytes())
    .map_err(|_| AppError::Config("Razorpay key secret is not a valid HMAC key".to_string()))?;
  mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
  Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a Razorpay callback signature.
pub fn verify_razorpay_signature(
  key_secret: &str,
  order_id: &str,
  payment_id: &str,
  signature: &str,
) -> Result<(), AppError> {
  let mut mac = HmacSha256::new_from_slice(key_secret.as_bytes())
    .map_err(|_| AppError::Config("Razorpay key secret is not a valid HMAC key".to_string()))?;
  mac.update(format!("{}|{}", order_id, payment_id).as_bytes());

  let sig_bytes = hex::decode(signature.trim()).map_err(|_| AppError::InvalidSignature)?;
  mac.verify_slice(&sig_bytes).map_err(|_| {
    warn!(razorpay_order_id = %order_id, "Razorpay signature mismatch.");
    AppError::InvalidSignature
  })
}

/// Verifies the signature, then asks the gateway whether the payment was
/// captured.
#[instrument(name = "payment_verification::razorpay_outcome", skip(client, key_secret, signature), err(Display))]
pub async fn razorpay_outcome(
  client: &dyn RazorpayClient,
  key_secret: &str,
  order_id: &str,
  payment_id: &str,
  signature: &str,
) -> Result<PaymentOutcome, AppError> {
  verify_razorpay_signature(key_secret, order_id, payment_id, signature)?;

  let payment = client.fetch_payment(payment_id).await?;
  if payment.is_captured() {
    Ok(PaymentOutcome::Succeeded {
      payment_id: Some(payment.id),
    })
  } else {
    Ok(PaymentOutcome::Failed)
  }
}
