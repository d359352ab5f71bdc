// stepwise/src/mock.rs

//! In-memory `ContractBackend` for tests and dry runs.
//!
//! It executes nothing. It hands out deterministic addresses, records every
//! deployment and call in order, answers views from a scripted table, keeps a
//! tiny `mint` / `balanceOf` ledger and tracks a block clock.

use crate::contracts::{ContractBackend, Token, TxReceipt};
use crate::error::{StepwiseError, StepwiseResult};
use alloy_primitives::{keccak256, Address, B256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{event, Level};

pub const MOCK_ACCOUNT_COUNT: usize = 20;
pub const MOCK_GENESIS_TIMESTAMP: u64 = 1_650_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
  pub address: Address,
  pub artifact: String,
  pub deployer: Address,
  pub args: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
  pub contract: Address,
  pub artifact: String,
  pub from: Address,
  pub method: String,
  pub args: Vec<Token>,
}

#[derive(Default)]
struct MockState {
  accounts: Vec<Address>,
  nonce: u64,
  block_number: u64,
  timestamp: u64,
  next_timestamp: Option<u64>,
  deployments: Vec<Deployment>,
  calls: Vec<RecordedCall>,
  views: HashMap<(Address, String), Token>,
  default_views: HashMap<String, Token>,
  failures: HashMap<String, String>,
  // (token, holder) -> balance
  balances: HashMap<(Address, Address), U256>,
}

impl MockState {
  fn artifact_at(&self, address: Address) -> Option<&str> {
    self
      .deployments
      .iter()
      .find(|d| d.address == address)
      .map(|d| d.artifact.as_str())
  }

  fn check_failure(&self, artifact: &str, method: &str) -> StepwiseResult<()> {
    match self.failures.get(method) {
      Some(message) => Err(StepwiseError::contract(artifact, method, message.clone())),
      None => Ok(()),
    }
  }

  fn mine(&mut self) -> u64 {
    self.block_number += 1;
    self.timestamp = match self.next_timestamp.take() {
      Some(ts) => ts,
      None => self.timestamp.saturating_add(1),
    };
    self.block_number
  }

  fn next_hash(&mut self) -> B256 {
    self.nonce += 1;
    keccak256(self.nonce.to_be_bytes())
  }
}

fn mock_account(index: usize) -> Address {
  let hash = keccak256(format!("stepwise-mock-account-{index}").as_bytes());
  Address::from_slice(&hash[12..])
}

fn deployment_address(deployer: Address, nonce: u64) -> Address {
  let mut preimage = deployer.to_vec();
  preimage.extend_from_slice(&nonce.to_be_bytes());
  let hash = keccak256(&preimage);
  Address::from_slice(&hash[12..])
}

pub struct MockBackend {
  state: Mutex<MockState>,
}

impl Default for MockBackend {
  fn default() -> Self {
    Self::new()
  }
}

impl MockBackend {
  pub fn new() -> Self {
    let state = MockState {
      accounts: (0..MOCK_ACCOUNT_COUNT).map(mock_account).collect(),
      timestamp: MOCK_GENESIS_TIMESTAMP,
      ..MockState::default()
    };
    Self {
      state: Mutex::new(state),
    }
  }

  /// Makes every later call or view of `method` fail with `message`.
  /// Deployments can be failed by passing the artifact name.
  pub fn fail_on(&self, method: impl Into<String>, message: impl Into<String>) {
    self.state.lock().failures.insert(method.into(), message.into());
  }

  /// Drops every injected failure.
  pub fn clear_failures(&self) {
    self.state.lock().failures.clear();
  }

  /// Scripts the answer for `contract.method(..)` views.
  pub fn script_view(&self, contract: Address, method: impl Into<String>, answer: Token) {
    self.state.lock().views.insert((contract, method.into()), answer);
  }

  /// Scripts the answer for `method` on any contract without a specific answer.
  pub fn script_default_view(&self, method: impl Into<String>, answer: Token) {
    self.state.lock().default_views.insert(method.into(), answer);
  }

  /// Places an `artifact` instance at `address` without a deployment
  /// transaction, the way a node's `setCode` does. Used to bring contracts
  /// from a stored record onto a fresh chain.
  pub fn install_code(&self, address: Address, artifact: impl Into<String>) {
    let artifact = artifact.into();
    let mut state = self.state.lock();
    state.deployments.retain(|d| d.address != address);
    event!(Level::TRACE, %artifact, %address, "Mock code installed.");
    state.deployments.push(Deployment {
      address,
      artifact,
      deployer: Address::ZERO,
      args: Vec::new(),
    });
  }

  pub fn account(&self, index: usize) -> Option<Address> {
    self.state.lock().accounts.get(index).copied()
  }

  pub fn deployments(&self) -> Vec<Deployment> {
    self.state.lock().deployments.clone()
  }

  pub fn calls(&self) -> Vec<RecordedCall> {
    self.state.lock().calls.clone()
  }

  /// Recorded calls of `method`, in order.
  pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
    self
      .state
      .lock()
      .calls
      .iter()
      .filter(|c| c.method == method)
      .cloned()
      .collect()
  }

  pub fn artifact_at(&self, address: Address) -> Option<String> {
    self.state.lock().artifact_at(address).map(str::to_string)
  }

  pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
    self
      .state
      .lock()
      .balances
      .get(&(token, holder))
      .copied()
      .unwrap_or_default()
  }

  pub fn now(&self) -> u64 {
    self.state.lock().timestamp
  }
}

#[async_trait]
impl ContractBackend for MockBackend {
  async fn accounts(&self) -> StepwiseResult<Vec<Address>> {
    Ok(self.state.lock().accounts.clone())
  }

  async fn deploy(&self, artifact: &str, from: Address, args: Vec<Token>) -> StepwiseResult<Address> {
    let mut state = self.state.lock();
    state.check_failure(artifact, artifact)?;
    let nonce = state.nonce;
    state.next_hash();
    state.mine();
    let address = deployment_address(from, nonce);
    state.deployments.push(Deployment {
      address,
      artifact: artifact.to_string(),
      deployer: from,
      args,
    });
    event!(Level::TRACE, %artifact, %address, "Mock deployment recorded.");
    Ok(address)
  }

  async fn send(&self, contract: Address, from: Address, method: &str, args: Vec<Token>) -> StepwiseResult<TxReceipt> {
    let mut state = self.state.lock();
    let artifact = state
      .artifact_at(contract)
      .map(str::to_string)
      .ok_or_else(|| StepwiseError::contract(contract.to_string(), method, "no contract deployed at address"))?;
    state.check_failure(&artifact, method)?;

    if method == "mint" {
      let to = args.first().and_then(Token::as_address);
      let amount = args.get(1).and_then(Token::as_uint);
      match (to, amount) {
        (Some(to), Some(amount)) => {
          let balance = state.balances.entry((contract, to)).or_default();
          *balance = balance.saturating_add(amount);
        }
        _ => return Err(StepwiseError::contract(&artifact, method, "expected (address, uint) arguments")),
      }
    }

    let tx_hash = state.next_hash();
    let block_number = state.mine();
    state.calls.push(RecordedCall {
      contract,
      artifact,
      from,
      method: method.to_string(),
      args,
    });
    Ok(TxReceipt {
      tx_hash,
      block_number,
      from,
      to: contract,
      method: method.to_string(),
    })
  }

  async fn view(&self, contract: Address, method: &str, args: Vec<Token>) -> StepwiseResult<Token> {
    let state = self.state.lock();
    let artifact = state.artifact_at(contract).unwrap_or("<unknown>");
    state.check_failure(artifact, method)?;

    if let Some(answer) = state
      .views
      .get(&(contract, method.to_string()))
      .or_else(|| state.default_views.get(method))
    {
      return Ok(answer.clone());
    }
    if method == "balanceOf" {
      let holder = args
        .first()
        .and_then(Token::as_address)
        .ok_or_else(|| StepwiseError::contract(artifact, method, "expected an address argument"))?;
      let balance = state.balances.get(&(contract, holder)).copied().unwrap_or_default();
      return Ok(Token::Uint(balance));
    }
    Err(StepwiseError::contract(artifact, method, "no scripted response for view"))
  }

  async fn block_timestamp(&self) -> StepwiseResult<u64> {
    Ok(self.state.lock().timestamp)
  }

  async fn set_next_block_timestamp(&self, timestamp: u64) -> StepwiseResult<()> {
    let mut state = self.state.lock();
    if timestamp <= state.timestamp {
      return Err(StepwiseError::Internal(format!(
        "next block timestamp {} must be after current {}",
        timestamp, state.timestamp
      )));
    }
    state.next_timestamp = Some(timestamp);
    Ok(())
  }

  async fn increase_time(&self, seconds: u64) -> StepwiseResult<()> {
    let mut state = self.state.lock();
    let current = state.timestamp;
    state.timestamp = current.checked_add(seconds).ok_or_else(|| {
      StepwiseError::Internal(format!(
        "increasing time by {}s overflows current timestamp {}",
        seconds, current
      ))
    })?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn deploy_addresses_are_deterministic_and_distinct() {
    let a = MockBackend::new();
    let b = MockBackend::new();
    let from = a.account(0).unwrap();

    let first = a.deploy("Token", from, vec![]).await.unwrap();
    let second = a.deploy("Token", from, vec![]).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(b.deploy("Token", from, vec![]).await.unwrap(), first);
  }

  #[tokio::test]
  async fn mint_feeds_balance_of() {
    let backend = MockBackend::new();
    let from = backend.account(0).unwrap();
    let holder = backend.account(5).unwrap();
    let token = backend.deploy("WrapBitcoin", from, vec![]).await.unwrap();

    backend
      .send(token, from, "mint", vec![holder.into(), 100u64.into()])
      .await
      .unwrap();
    let balance = backend.view(token, "balanceOf", vec![holder.into()]).await.unwrap();
    assert_eq!(balance, Token::Uint(U256::from(100u64)));
  }

  #[tokio::test]
  async fn installed_code_accepts_calls() {
    let backend = MockBackend::new();
    let from = backend.account(0).unwrap();
    let token = backend.account(19).unwrap();
    assert!(backend.send(token, from, "mint", vec![from.into(), 1u64.into()]).await.is_err());

    backend.install_code(token, "Convex");
    backend
      .send(token, from, "mint", vec![from.into(), 7u64.into()])
      .await
      .unwrap();
    assert_eq!(backend.artifact_at(token).as_deref(), Some("Convex"));
    assert_eq!(backend.balance_of(token, from), U256::from(7u64));
  }

  #[tokio::test]
  async fn next_timestamp_applies_to_next_block_only() {
    let backend = MockBackend::new();
    let from = backend.account(0).unwrap();
    backend.set_next_block_timestamp(MOCK_GENESIS_TIMESTAMP + 100).await.unwrap();
    backend.deploy("A", from, vec![]).await.unwrap();
    assert_eq!(backend.now(), MOCK_GENESIS_TIMESTAMP + 100);
    backend.deploy("B", from, vec![]).await.unwrap();
    assert_eq!(backend.now(), MOCK_GENESIS_TIMESTAMP + 101);
    assert!(backend.set_next_block_timestamp(MOCK_GENESIS_TIMESTAMP).await.is_err());
  }

  #[tokio::test]
  async fn increase_time_moves_clock_and_default_views_apply_everywhere() {
    let backend = MockBackend::new();
    let from = backend.account(0).unwrap();
    backend.increase_time(3_600).await.unwrap();
    assert_eq!(backend.block_timestamp().await.unwrap(), MOCK_GENESIS_TIMESTAMP + 3_600);
    assert!(matches!(
      backend.increase_time(u64::MAX).await,
      Err(StepwiseError::Internal(_))
    ));
    assert_eq!(backend.now(), MOCK_GENESIS_TIMESTAMP + 3_600);

    let schedule = backend.deploy("SupplySchedule", from, vec![]).await.unwrap();
    backend.script_default_view("epochLength", Token::Uint(U256::from(10u64)));
    assert_eq!(
      backend.view(schedule, "epochLength", vec![]).await.unwrap(),
      Token::Uint(U256::from(10u64))
    );
    backend.script_view(schedule, "epochLength", Token::Uint(U256::from(20u64)));
    assert_eq!(
      backend.view(schedule, "epochLength", vec![]).await.unwrap(),
      Token::Uint(U256::from(20u64))
    );
  }
}
