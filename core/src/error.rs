// stepwise/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::pricing::PricingError;

#[derive(Debug, Error)]
pub enum StepwiseError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Step '{step_name}' reads '{key}', which is neither in the initial context nor produced by an earlier step")]
  UnsatisfiedInput { step_name: String, key: String },

  #[error("Context key '{key}' is missing")]
  MissingKey { key: String },

  #[error("Type mismatch for context key '{key}' (expected {expected_type}, found {found_type})")]
  TypeMismatch {
    key: String,
    expected_type: String,
    found_type: String,
  },

  #[error("Error in user-provided handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error for '{scope}': {message}")]
  ConfigurationError { scope: String, message: String },

  #[error("Price conversion failed: {0}")]
  Pricing(#[from] PricingError),

  #[error("Contract call {contract}.{method} failed: {message}")]
  Contract {
    contract: String,
    method: String,
    message: String,
  },

  #[error("Price feed error: {0}")]
  PriceFeed(String),

  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Internal stepwise error: {0}")]
  Internal(String),
}

impl StepwiseError {
  pub(crate) fn contract(contract: impl Into<String>, method: impl Into<String>, message: impl Into<String>) -> Self {
    StepwiseError::Contract {
      contract: contract.into(),
      method: method.into(),
      message: message.into(),
    }
  }
}

// Handlers that reach for anyhow land here. A StepwiseError already wrapped in
// anyhow is kept as the source rather than flattened.
impl From<AnyhowError> for StepwiseError {
  fn from(err: AnyhowError) -> Self {
    StepwiseError::HandlerError { source: err }
  }
}

pub type StepwiseResult<T, E = StepwiseError> = std::result::Result<T, E>;
