// tests/common/mod.rs
#![allow(dead_code)]

use shopflow::{ContextData, FlowError, PipelineControl};
use tracing::Level;

/// A toy checkout: each step appends to `trail` and moves `units` around.
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub units_reserved: i32,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
  pub payment_required: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow error: {0}")]
  Flow(String),

  #[error("step failed: {0}")]
  Step(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(err.to_string())
  }
}

/// Handler that records its step name, reserves `units`, and stops when the
/// context asks it to.
pub fn reserving_handler(step_name: &'static str, units: i32) -> shopflow::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let stop = ctx.update(|data| {
        data.units_reserved += units;
        data.trail.push(step_name.to_string());
        data.stop_at.as_deref() == Some(step_name)
      });
      tracing::debug!(target: "test_handlers", step = step_name, units, "reserved");
      Ok(if stop { PipelineControl::Stop } else { PipelineControl::Continue })
    })
  })
}

pub fn failing_handler(step_name: &'static str, message: &'static str) -> shopflow::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().trail.push(step_name.to_string());
      Err(TestError::Step(message.to_string()))
    })
  })
}

use once_cell::sync::Lazy;
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
