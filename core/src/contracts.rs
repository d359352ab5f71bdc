// stepwise/src/contracts.rs

//! The boundary to deployed contracts.
//!
//! Contracts are addressed by artifact name and called by method name with
//! loosely typed [`Token`] arguments. What sits behind [`ContractBackend`] (a
//! node, a simulator, the in-memory [`crate::mock::MockBackend`]) is opaque to
//! the pipelines.

use crate::error::{StepwiseError, StepwiseResult};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// An ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
  Address(Address),
  Uint(U256),
  Bool(bool),
  String(String),
  Bytes32(B256),
  Array(Vec<Token>),
}

impl Token {
  pub fn as_address(&self) -> Option<Address> {
    match self {
      Token::Address(a) => Some(*a),
      _ => None,
    }
  }

  pub fn as_uint(&self) -> Option<U256> {
    match self {
      Token::Uint(v) => Some(*v),
      _ => None,
    }
  }

}

impl From<Address> for Token {
  fn from(v: Address) -> Self {
    Token::Address(v)
  }
}

impl From<U256> for Token {
  fn from(v: U256) -> Self {
    Token::Uint(v)
  }
}

impl From<u64> for Token {
  fn from(v: u64) -> Self {
    Token::Uint(U256::from(v))
  }
}

impl From<bool> for Token {
  fn from(v: bool) -> Self {
    Token::Bool(v)
  }
}

impl From<&str> for Token {
  fn from(v: &str) -> Self {
    Token::String(v.to_string())
  }
}

impl From<String> for Token {
  fn from(v: String) -> Self {
    Token::String(v)
  }
}

impl From<B256> for Token {
  fn from(v: B256) -> Self {
    Token::Bytes32(v)
  }
}

impl<T: Into<Token>> From<Vec<T>> for Token {
  fn from(v: Vec<T>) -> Self {
    Token::Array(v.into_iter().map(Into::into).collect())
  }
}

/// A labelled account that sends transactions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signer {
  pub label: String,
  pub address: Address,
}

impl Signer {
  pub fn new(label: impl Into<String>, address: Address) -> Self {
    Self {
      label: label.into(),
      address,
    }
  }
}

impl fmt::Display for Signer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.label, self.address)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
  pub tx_hash: B256,
  pub block_number: u64,
  pub from: Address,
  pub to: Address,
  pub method: String,
}

/// Everything a deployment script needs from a chain.
#[async_trait]
pub trait ContractBackend: Send + Sync {
  /// Accounts available for signing, in a stable order.
  async fn accounts(&self) -> StepwiseResult<Vec<Address>>;

  /// Deploys `artifact` with constructor `args`, returning its address.
  async fn deploy(&self, artifact: &str, from: Address, args: Vec<Token>) -> StepwiseResult<Address>;

  /// Sends a state-changing call and waits for it to be mined.
  async fn send(&self, contract: Address, from: Address, method: &str, args: Vec<Token>) -> StepwiseResult<TxReceipt>;

  /// Read-only call.
  async fn view(&self, contract: Address, method: &str, args: Vec<Token>) -> StepwiseResult<Token>;

  async fn block_timestamp(&self) -> StepwiseResult<u64>;

  /// Pins the timestamp of the next mined block. Must be in the future.
  async fn set_next_block_timestamp(&self, timestamp: u64) -> StepwiseResult<()>;

  /// Moves the clock forward by `seconds`.
  async fn increase_time(&self, seconds: u64) -> StepwiseResult<()>;
}

pub type SharedBackend = Arc<dyn ContractBackend>;

async fn default_sender(backend: &SharedBackend) -> StepwiseResult<Address> {
  backend
    .accounts()
    .await?
    .first()
    .copied()
    .ok_or_else(|| StepwiseError::Internal("backend exposes no accounts".to_string()))
}

/// Deploys (from the default sender) or attaches to instances of one artifact.
#[derive(Clone)]
pub struct ContractFactory {
  artifact: String,
  backend: SharedBackend,
}

impl ContractFactory {
  pub fn new(backend: SharedBackend, artifact: impl Into<String>) -> Self {
    Self {
      artifact: artifact.into(),
      backend,
    }
  }

  #[instrument(name = "ContractFactory::deploy", skip_all, fields(artifact = %self.artifact), err(Display))]
  pub async fn deploy(&self, args: Vec<Token>) -> StepwiseResult<Contract> {
    let from = default_sender(&self.backend).await?;
    let address = self.backend.deploy(&self.artifact, from, args).await?;
    event!(Level::DEBUG, %address, "Contract deployed.");
    Ok(self.attach(address))
  }

  /// Handle to an existing instance of this artifact.
  pub fn attach(&self, address: Address) -> Contract {
    Contract {
      artifact: self.artifact.clone(),
      address,
      backend: self.backend.clone(),
      signer: None,
    }
  }
}

impl fmt::Debug for ContractFactory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContractFactory")
      .field("artifact", &self.artifact)
      .finish()
  }
}

/// A deployed contract instance, optionally bound to a signer.
#[derive(Clone)]
pub struct Contract {
  artifact: String,
  address: Address,
  backend: SharedBackend,
  signer: Option<Signer>,
}

impl Contract {
  pub fn address(&self) -> Address {
    self.address
  }

  /// Same instance, sending from `signer`.
  pub fn connect(&self, signer: &Signer) -> Self {
    Self {
      signer: Some(signer.clone()),
      ..self.clone()
    }
  }

  #[instrument(
    name = "Contract::call",
    skip(self, args),
    fields(artifact = %self.artifact, address = %self.address, signer = ?self.signer.as_ref().map(|s| &s.label)),
    err(Display)
  )]
  pub async fn call(&self, method: &str, args: Vec<Token>) -> StepwiseResult<TxReceipt> {
    let from = match &self.signer {
      Some(s) => s.address,
      None => default_sender(&self.backend).await?,
    };
    self.backend.send(self.address, from, method, args).await
  }

  pub async fn view(&self, method: &str, args: Vec<Token>) -> StepwiseResult<Token> {
    self.backend.view(self.address, method, args).await
  }

  /// Read-only call expected to return an unsigned integer.
  pub async fn view_uint(&self, method: &str, args: Vec<Token>) -> StepwiseResult<U256> {
    let token = self.view(method, args).await?;
    token
      .as_uint()
      .ok_or_else(|| StepwiseError::contract(&self.artifact, method, format!("expected uint, got {:?}", token)))
  }
}

impl fmt::Debug for Contract {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Contract")
      .field("artifact", &self.artifact)
      .field("address", &self.address)
      .field("signer", &self.signer)
      .finish()
  }
}

impl fmt::Display for Contract {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.artifact, self.address)
  }
}
