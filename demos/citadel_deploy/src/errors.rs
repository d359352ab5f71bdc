// citadel_deploy/src/errors.rs

use stepwise::{PricingError, StepwiseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Deployment Workflow Error: {source}")]
  Workflow {
    #[from]
    source: StepwiseError,
  },

  #[error("Internal Error: {0}")]
  Internal(String),
}

// Pricing failures travel through the workflow variant so callers match one place.
impl From<PricingError> for AppError {
  fn from(err: PricingError) -> Self {
    AppError::Workflow {
      source: StepwiseError::Pricing(err),
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<StepwiseError>() {
      Ok(source) => AppError::Workflow { source },
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
