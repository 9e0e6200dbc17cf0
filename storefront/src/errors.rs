// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use shopflow::FlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("{0}")]
  NotFound(String),

  /// The message names the order's current status.
  #[error("{0}")]
  InvalidTransition(String),

  #[error("Only {available} items available for {product}")]
  InsufficientStock { product: String, available: i32 },

  #[error("Product {0} is no longer available")]
  ProductUnavailable(String),

  #[error("Invalid signature")]
  InvalidSignature,

  #[error("Invalid status: {0}")]
  InvalidStatus(String),

  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl From<sqlx::migrate::MigrateError> for AppError {
  fn from(err: sqlx::migrate::MigrateError) -> Self {
    AppError::Internal(format!("Migration failed: {}", err))
  }
}

impl AppError {
  /// Machine-readable reason carried in every failure body.
  pub fn code(&self) -> &'static str {
    match self {
      AppError::NotFound(_) => "not_found",
      AppError::InvalidTransition(_) => "invalid_transition",
      AppError::InsufficientStock { .. } => "insufficient_stock",
      AppError::ProductUnavailable(_) => "product_unavailable",
      AppError::InvalidSignature => "invalid_signature",
      AppError::InvalidStatus(_) => "invalid_status",
      AppError::Validation(_) => "validation_error",
      AppError::Auth(_) => "unauthorized",
      AppError::Forbidden(_) => "forbidden",
      AppError::Payment(_) => "payment_error",
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => "internal_error",
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::NotFound(_) | AppError::ProductUnavailable(_) => StatusCode::NOT_FOUND,
      AppError::InvalidTransition(_) | AppError::InsufficientStock { .. } => StatusCode::CONFLICT,
      AppError::InvalidSignature | AppError::InvalidStatus(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, code = self.code(), "Request rejected");
    }

    let message = match self {
      AppError::Sqlx(_) => "Database operation failed".to_string(),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        "Workflow processing error".to_string()
      }
      other => other.to_string(),
    };

    HttpResponse::build(status).json(json!({
      "success": false,
      "error": self.code(),
      "message": message,
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
