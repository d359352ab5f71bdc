// stepwise/src/pipeline/definition.rs

//! Contains the `Pipeline<Err>` struct definition and methods for its
//! construction, handler registration and structural modification.

use crate::core::context::{Context, Handler};
use crate::core::control::StepOutput;
use crate::core::step::StepDecl;
use crate::error::StepwiseError;
use std::collections::HashMap;
use std::future::Future;
use tracing::{event, Level};

/// An ordered list of declared steps plus the handler registered for each.
///
/// `Err` is the error type handlers return. It must be `From<StepwiseError>`
/// so framework failures (missing handler, unsatisfied input) surface through
/// the same type.
pub struct Pipeline<Err>
where
  Err: std::error::Error + From<StepwiseError> + Send + Sync + 'static,
{
  /// Ordered list of step declarations for this pipeline.
  pub(crate) steps: Vec<StepDecl>,
  pub(crate) handlers: HashMap<String, Handler<Err>>,
}

impl<Err> Pipeline<Err>
where
  Err: std::error::Error + From<StepwiseError> + Send + Sync + 'static,
{
  /// Creates a new `Pipeline` from an ordered set of step declarations.
  pub fn new(step_decls: &[StepDecl]) -> Self {
    let pipeline = Self {
      steps: Vec::with_capacity(step_decls.len()),
      handlers: HashMap::new(),
    };
    step_decls.iter().cloned().fold(pipeline, |mut p, decl| {
      p.ensure_step_not_exists(&decl.name);
      p.steps.push(decl);
      p
    })
  }

  /// Shorthand for a pipeline of required steps with no declared data flow.
  pub fn from_names(names: &[&str]) -> Self {
    let decls: Vec<StepDecl> = names.iter().map(|n| StepDecl::new(*n)).collect();
    Self::new(&decls)
  }

  /// Panics if no step with the given name is declared.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      // Programming error (typo in a step name), not a runtime failure.
      panic!("Stepwise setup error: Step '{}' not found in pipeline definition.", step_name);
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "Stepwise setup error: Step '{}' already exists in pipeline definition.",
        step_name
      );
    }
  }

  fn position_of(&self, step_name: &str) -> usize {
    self.ensure_step_exists(step_name);
    // ensure_step_exists panics otherwise
    self.steps.iter().position(|s| s.name == step_name).unwrap_or_default()
  }

  // --- Handler registration ---

  /// Registers the handler for a step, replacing any previous one.
  ///
  /// The handler receives a snapshot of the accumulated context and returns
  /// anything convertible into a `StepOutput`: a `Context` to merge, `()` for
  /// an observer, or an explicit `StepOutput`. Its error type must convert
  /// into the pipeline's `Err`.
  pub fn on<F, O, UserProvidedErr>(&mut self, step_name: &str, handler_fn: impl Fn(Context) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<O, UserProvidedErr>> + Send + 'static,
    O: Into<StepOutput> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let final_handler: Handler<Err> = Box::new(move |ctx| {
      let user_fut = handler_fn(ctx);
      Box::pin(async move {
        user_fut
          .await
          .map(Into::<StepOutput>::into)
          .map_err(Into::<Err>::into)
      })
    });
    if self.handlers.insert(step_name.to_string(), final_handler).is_some() {
      event!(Level::WARN, %step_name, "Replacing existing handler for step.");
    }
  }

  /// Registers an already boxed handler for a step.
  pub fn on_boxed(&mut self, step_name: &str, handler: Handler<Err>) {
    self.ensure_step_exists(step_name);
    self.handlers.insert(step_name.to_string(), handler);
  }

  /// Registers a synchronous observer. It sees the context but never changes it.
  pub fn observe(&mut self, step_name: &str, observer: impl Fn(&Context) + Send + Sync + 'static) {
    self.ensure_step_exists(step_name);
    let observer = std::sync::Arc::new(observer);
    let final_handler: Handler<Err> = Box::new(move |ctx| {
      let observer = observer.clone();
      Box::pin(async move {
        observer(&ctx);
        Ok::<_, Err>(StepOutput::Unchanged)
      })
    });
    self.handlers.insert(step_name.to_string(), final_handler);
  }

  // --- Basic Step Manipulation Methods ---

  pub fn insert_before_step(&mut self, existing_step_name: &str, decl: impl Into<StepDecl>) {
    let idx = self.position_of(existing_step_name);
    let decl = decl.into();
    self.ensure_step_not_exists(&decl.name);
    self.steps.insert(idx, decl);
  }

  pub fn insert_after_step(&mut self, existing_step_name: &str, decl: impl Into<StepDecl>) {
    let idx = self.position_of(existing_step_name);
    let decl = decl.into();
    self.ensure_step_not_exists(&decl.name);
    self.steps.insert(idx + 1, decl);
  }

  /// Appends a step at the end of the pipeline.
  pub fn push_step(&mut self, decl: impl Into<StepDecl>) {
    let decl = decl.into();
    self.ensure_step_not_exists(&decl.name);
    self.steps.push(decl);
  }

  /// Removes a step and its handler. Removing an unknown step is a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Some(idx) = self.steps.iter().position(|s| s.name == step_name) {
      self.steps.remove(idx);
      self.handlers.remove(step_name);
    }
  }

  // --- Inspection ---

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }
}
