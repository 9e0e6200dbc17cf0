// shopflow/src/pipeline/execution.rs

//! `Pipeline::run`: walks the steps in order and drives their handlers.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

/// What a phase of a step ended with.
enum PhaseOutcome {
  Continue,
  Stopped,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx_data`.
  ///
  /// A step runs its `before`, `on` and `after` handlers in registration order.
  /// The first `Stop` ends the run with [`PipelineResult::Stopped`]; the first
  /// error is returned as is. A non-optional step without any handler fails
  /// with [`FlowError::HandlerMissing`].
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if step_def.should_skip(&ctx_data) {
        event!(Level::DEBUG, step = step_name, "Step skipped by its condition.");
        continue;
      }

      let phases = [
        ("before", self.before.get(step_name)),
        ("on", self.on.get(step_name)),
        ("after", self.after.get(step_name)),
      ];
      let has_handlers = phases.iter().any(|(_, h)| h.is_some_and(|v| !v.is_empty()));
      if !has_handlers {
        if step_def.optional {
          event!(Level::DEBUG, step = step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step = step_name, "Non-optional step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = info_span!("pipeline_step", step = step_name, step_index = step_idx);
      for (phase, handlers) in phases {
        let Some(handlers) = handlers else { continue };
        let outcome = run_phase(handlers, &ctx_data, phase)
          .instrument(step_span.clone())
          .await?;
        if let PhaseOutcome::Stopped = outcome {
          return Ok(PipelineResult::Stopped);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}

async fn run_phase<TData, Err>(
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
  phase: &'static str,
) -> Result<PhaseOutcome, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for handler_fn in handlers {
    match handler_fn(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => {
        event!(Level::INFO, phase, "Pipeline stopped by a handler.");
        return Ok(PhaseOutcome::Stopped);
      }
      Err(e) => {
        event!(Level::WARN, phase, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(PhaseOutcome::Continue)
}
