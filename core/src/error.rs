// shopflow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Errors raised by the engine itself (as opposed to errors raised by handlers,
/// which keep the pipeline's own error type).
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No pipeline registered for context type {context_type}")]
  PipelineNotRegistered { context_type: String },

  #[error("Context type mismatch (expected {expected_type})")]
  TypeMismatch { expected_type: String },

  #[error("Error in handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerError { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
