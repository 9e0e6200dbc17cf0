// shopflow/src/pipeline/hooks.rs

//! Registration of `before` / `on` / `after` handlers.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use std::future::Future;
use tracing::{event, Level};

#[derive(Clone, Copy, Debug)]
enum Phase {
  Before,
  On,
  After,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn push_handler<F, UserErr>(
    &mut self,
    phase: Phase,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    event!(Level::TRACE, step = step_name, phase = ?phase, "Registering handler.");
    let handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    let slot = match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    };
    slot.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Adds a handler that runs before the step's `on` handlers.
  pub fn before_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::Before, step_name, handler_fn);
  }

  /// Adds a main handler for the step.
  pub fn on_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::On, step_name, handler_fn);
  }

  /// Adds a handler that runs after the step's `on` handlers.
  pub fn after_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(Phase::After, step_name, handler_fn);
  }
}
