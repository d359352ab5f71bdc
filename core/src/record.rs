// stepwise/src/record.rs

//! The persisted deployment record: a flat JSON object mapping role names to
//! contract addresses.

use crate::error::{StepwiseError, StepwiseResult};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{event, instrument, Level};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentRecord {
  entries: BTreeMap<String, Address>,
}

impl DeploymentRecord {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, address: Address) {
    self.entries.insert(name.into(), address);
  }

  pub fn with(mut self, name: impl Into<String>, address: Address) -> Self {
    self.insert(name, address);
    self
  }

  pub fn get(&self, name: &str) -> Option<Address> {
    self.entries.get(name).copied()
  }

  pub fn require(&self, name: &str) -> StepwiseResult<Address> {
    self.get(name).ok_or_else(|| StepwiseError::ConfigurationError {
      scope: "deployment record".to_string(),
      message: format!("no address recorded for '{}'", name),
    })
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), *v))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

pub fn record_path(base_path: &Path, name: &str) -> PathBuf {
  base_path.join(format!("{}.json", name))
}

/// Writes `record` to `<base_path>/<name>.json`, creating the directory if
/// needed. An existing file is removed first and never patched.
#[instrument(skip(record), fields(entries = record.len()), err(Display))]
pub fn store(base_path: &Path, name: &str, record: &DeploymentRecord) -> StepwiseResult<PathBuf> {
  fs::create_dir_all(base_path)?;
  let path = record_path(base_path, name);
  if path.exists() {
    fs::remove_file(&path)?;
  }
  fs::write(&path, serde_json::to_string_pretty(record)?)?;
  event!(Level::INFO, path = %path.display(), "Deployment record stored.");
  Ok(path)
}

#[instrument(err(Display))]
pub fn load(base_path: &Path, name: &str) -> StepwiseResult<DeploymentRecord> {
  let path = record_path(base_path, name);
  let raw = fs::read_to_string(&path)?;
  let record: DeploymentRecord = serde_json::from_str(&raw)?;
  event!(Level::DEBUG, path = %path.display(), entries = record.len(), "Deployment record loaded.");
  Ok(record)
}
