// stepwise/src/core/control.rs

//! Defines what a step hands back to the pipeline.

use crate::core::context::Context;

/// Result of a single step.
#[derive(Debug, Clone, Default)]
pub enum StepOutput {
  /// A partial context, shallow-merged into the accumulated one.
  Merge(Context),
  /// The step only observed the context (typically logging).
  #[default]
  Unchanged,
}

impl From<Context> for StepOutput {
  fn from(partial: Context) -> Self {
    StepOutput::Merge(partial)
  }
}

impl From<()> for StepOutput {
  fn from(_: ()) -> Self {
    StepOutput::Unchanged
  }
}

impl From<Option<Context>> for StepOutput {
  fn from(partial: Option<Context>) -> Self {
    partial.map_or(StepOutput::Unchanged, StepOutput::Merge)
  }
}
