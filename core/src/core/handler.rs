// shopflow/src/core/handler.rs

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// Boxed async handler stored by a pipeline.
///
/// It takes a clone of the run's `ContextData<TData>` and resolves to the flow
/// signal or the pipeline's error type. Handlers lock the context to read or
/// write state and must release the guard before awaiting.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
