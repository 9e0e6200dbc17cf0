// shopflow/src/core/step.rs

use super::ContextData;
use std::sync::Arc;

/// Predicate evaluated right before a step; `true` skips the step.
pub type SkipCondition<TData> = Arc<dyn Fn(&TData) -> bool + Send + Sync + 'static>;

/// A named step of a pipeline.
#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  /// Optional steps without handlers are skipped instead of failing the run.
  pub optional: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> StepDef<T> {
  pub(crate) fn should_skip(&self, ctx_data: &ContextData<T>) -> bool {
    match &self.skip_if {
      Some(cond) => ctx_data.with(|data| cond(data)),
      None => false,
    }
  }
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
