// stepwise/src/pipeline/execution.rs

//! Contains `Pipeline::run()`, which threads a context through the declared
//! steps, and the free-standing `pipe()` composer for ad-hoc step lists.

use crate::core::context::{Context, Handler};
use crate::core::control::StepOutput;
use crate::core::step::StepDecl;
use crate::error::StepwiseError;
use crate::pipeline::definition::Pipeline;
use std::collections::HashSet;
use tracing::{event, instrument, span, Instrument, Level};

impl<Err> Pipeline<Err>
where
  Err: std::error::Error + From<StepwiseError> + Send + Sync + 'static,
{
  /// Verifies that every key a step declares under `reads` is available when
  /// that step runs: either present in `initial` or produced by an earlier
  /// step that will actually execute.
  ///
  /// Steps without a handler are left out. Optional ones are skipped at run
  /// time and required ones fail with `HandlerMissing` there.
  pub fn check_dependencies(&self, initial: &Context) -> Result<(), StepwiseError> {
    let mut available: HashSet<&str> = initial.keys().collect();

    for step in self.steps.iter().filter(|s| self.handlers.contains_key(&s.name)) {
      if let Some(key) = step.reads.iter().find(|k| !available.contains(k.as_str())) {
        return Err(StepwiseError::UnsatisfiedInput {
          step_name: step.name.clone(),
          key: key.clone(),
        });
      }
      available.extend(step.produces.iter().map(String::as_str));
    }
    Ok(())
  }

  /// Executes the pipeline, starting from `initial`.
  ///
  /// Steps run strictly one after another; each one receives the context
  /// accumulated so far and its output is merged before the next starts.
  /// The first error aborts the run and is returned unchanged. Nothing that
  /// earlier steps did is undone.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      pipeline_error_type = %std::any::type_name::<Err>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, initial: Context) -> Result<Context, Err> {
    event!(Level::DEBUG, initial_keys = initial.len(), "Pipeline execution starting.");
    self.check_dependencies(&initial).map_err(Err::from)?;

    let mut ctx = initial;
    for (step_idx, step_decl) in self.steps.iter().enumerate() {
      let step_span = span!(
        Level::INFO,
        "pipeline_step_execution",
        step_name = step_decl.name.as_str(),
        step_index = step_idx,
        optional = step_decl.optional
      );

      let Some(handler_fn) = self.handlers.get(&step_decl.name) else {
        if step_decl.optional {
          event!(parent: &step_span, Level::DEBUG, "Optional step has no handler, skipping.");
          continue;
        }
        event!(parent: &step_span, Level::ERROR, "Non-optional step has no handler.");
        return Err(Err::from(StepwiseError::HandlerMissing {
          step_name: step_decl.name.clone(),
        }));
      };

      let output = handler_fn(ctx.clone()).instrument(step_span.clone()).await;
      match output {
        Ok(StepOutput::Merge(partial)) => {
          warn_on_undelivered(&step_span, step_decl, Some(&partial));
          event!(parent: &step_span, Level::DEBUG, merged_keys = partial.len(), "Step finished, merging output.");
          ctx.merge(partial);
        }
        Ok(StepOutput::Unchanged) => {
          warn_on_undelivered(&step_span, step_decl, None);
          event!(parent: &step_span, Level::DEBUG, "Step finished without output.");
        }
        Err(e) => {
          event!(parent: &step_span, Level::ERROR, error = %e, "Step failed.");
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, final_keys = ctx.len(), "Pipeline execution completed successfully.");
    Ok(ctx)
  }
}

fn warn_on_undelivered(step_span: &tracing::Span, decl: &StepDecl, partial: Option<&Context>) {
  for key in &decl.produces {
    if !partial.is_some_and(|p| p.contains(key)) {
      event!(parent: step_span, Level::WARN, %key, "Step declared a key it did not produce.");
    }
  }
}

/// Runs `steps` in order against `initial` and resolves with the final
/// context.
///
/// This is the bare composer: no declarations, no dependency check, steps are
/// named by position. With no steps it resolves with `initial` untouched.
#[instrument(name = "pipe", skip_all, fields(num_steps = steps.len()), err(Display))]
pub async fn pipe<Err>(initial: Context, steps: Vec<Handler<Err>>) -> Result<Context, Err>
where
  Err: std::error::Error + Send + Sync + 'static,
{
  let mut ctx = initial;
  for (step_idx, step_fn) in steps.iter().enumerate() {
    let step_span = span!(Level::INFO, "pipe_step", step_index = step_idx);
    match step_fn(ctx.clone()).instrument(step_span).await? {
      StepOutput::Merge(partial) => ctx.merge(partial),
      StepOutput::Unchanged => {}
    }
  }
  Ok(ctx)
}
