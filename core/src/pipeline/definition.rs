// shopflow/src/pipeline/definition.rs

use crate::core::handler::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;

/// An ordered set of named steps over the context data type `TData`.
///
/// Handlers return `Result<_, Err>`. `Err` must absorb [`FlowError`] so the
/// engine can report setup problems (a required step with no handler) through
/// the same error channel as the handlers.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(name, optional, skip_if)` triples.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  /// Panics on an unknown step name. A typo in a step name is a wiring bug,
  /// not a runtime condition.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("shopflow setup error: step '{}' is not defined in this pipeline", step_name);
    }
  }

  fn position_of(&self, step_name: &str) -> Result<usize, FlowError> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  /// Names of the steps in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Inserts a new step right after `existing_step_name`.
  pub fn insert_after_step(
    &mut self,
    existing_step_name: &str,
    new_step_name: &str,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> Result<(), FlowError> {
    let idx = self.position_of(existing_step_name)?;
    if self.steps.iter().any(|s| s.name == new_step_name) {
      return Err(FlowError::Internal(format!("step '{}' already exists", new_step_name)));
    }
    self.steps.insert(
      idx + 1,
      StepDef {
        name: new_step_name.to_string(),
        optional,
        skip_if,
      },
    );
    Ok(())
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) -> Result<(), FlowError> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].skip_if = skip_if;
    Ok(())
  }
}
