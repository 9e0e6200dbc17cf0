// shopflow/src/core/control.rs

//! Flow signals returned by handlers and the outcome of a whole run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Keep going: remaining handlers of this step, then the next step.
  Continue,
  /// Halt the run. Nothing after this handler executes.
  Stop,
}

/// Outcome of [`crate::Pipeline::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step ran (or was skipped by its condition).
  Completed,
  /// A handler returned [`PipelineControl::Stop`].
  Stopped,
}
