// shopflow/src/registry.rs

//! `Registry<E>`: pipelines keyed by their context data type.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` holds a `ContextData<TData>` for the runner's `TData`.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

struct TypedRunner<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Pipeline<TData, HandlerErr>,
}

#[async_trait]
impl<TData, HandlerErr, AppErr> ErasedRunner<AppErr> for TypedRunner<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let ctx_data = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<TData>>().to_string();
        event!(Level::ERROR, %expected_type, "Context type mismatch in registry dispatch.");
        return Err(AppErr::from(FlowError::TypeMismatch { expected_type }));
      }
    };
    self.pipeline.run(ctx_data).await.map_err(AppErr::from)
  }
}

/// Registry of pipelines, one per context data type.
///
/// `AppErr` is what [`Registry::run`] returns; it must absorb both the engine's
/// [`FlowError`] and each registered pipeline's handler error.
pub struct Registry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipelines: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
  _app_err: PhantomData<AppErr>,
}

impl<AppErr> Default for Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      pipelines: RwLock::new(HashMap::new()),
      _app_err: PhantomData,
    }
  }

  /// Registers `pipeline` for its context type, replacing any previous one.
  pub fn register_pipeline<TData, HandlerErr>(&self, pipeline: Pipeline<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
  {
    event!(
      Level::DEBUG,
      context_type = %std::any::type_name::<TData>(),
      steps = ?pipeline.step_names(),
      "Registering pipeline."
    );
    let runner: Arc<dyn ErasedRunner<AppErr>> = Arc::new(TypedRunner { pipeline });
    self.pipelines.write().insert(TypeId::of::<TData>(), runner);
  }

  pub fn is_registered<TData: 'static + Send + Sync>(&self) -> bool {
    self.pipelines.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the pipeline registered for `TData`.
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = self
      .pipelines
      .read()
      .get(&TypeId::of::<TData>())
      .cloned()
      .ok_or_else(|| {
        let context_type = std::any::type_name::<TData>().to_string();
        event!(Level::ERROR, %context_type, "No pipeline registered.");
        AppErr::from(FlowError::PipelineNotRegistered { context_type })
      })?;

    runner.run_erased(Box::new(ctx_data)).await
  }
}
