// stepwise/src/core/step.rs

//! Defines the declaration of a single step within a pipeline.

/// Declaration of a pipeline step: its name, optionality and the context keys
/// it reads and produces.
///
/// `reads` and `produces` make the data flow between steps visible before
/// anything runs; `Pipeline::check_dependencies` verifies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDecl {
  pub name: String,
  pub optional: bool,
  pub reads: Vec<String>,
  pub produces: Vec<String>,
}

impl StepDecl {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: false,
      reads: Vec::new(),
      produces: Vec::new(),
    }
  }

  /// Marks the step optional: without a handler it is skipped instead of failing.
  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  pub fn reads(mut self, keys: &[&str]) -> Self {
    self.reads.extend(keys.iter().map(|k| (*k).to_string()));
    self
  }

  pub fn produces(mut self, keys: &[&str]) -> Self {
    self.produces.extend(keys.iter().map(|k| (*k).to_string()));
    self
  }
}

impl From<&str> for StepDecl {
  fn from(name: &str) -> Self {
    StepDecl::new(name)
  }
}
