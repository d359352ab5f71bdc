// citadel_deploy/src/models/deployment.rs
use crate::models::token_in::{RoundPhase, TokenIn};
use alloy_primitives::{Address, U256};
use serde::Serialize;
use stepwise::{Contract, ExchangeRate};

/// A funding pool with the oracle that prices its asset.
#[derive(Debug, Clone)]
pub struct FundingPool {
  pub token: TokenIn,
  pub funding: Contract,
  pub oracle: Contract,
}

#[derive(Debug, Clone, Serialize)]
pub struct KnightingRoundDeployment {
  pub token: String,
  pub phase: RoundPhase,
  pub address: Address,
  pub token_out_per_token_in: ExchangeRate,
  pub start: u64,
  pub duration: u64,
  pub token_in_limit: U256,
}

/// Amounts a user approves and then bonds into the two fixed funding pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondAmounts {
  pub wbtc: U256,
  pub cvx: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MintableToken {
  Wbtc,
  Cvx,
}

impl MintableToken {
  /// Record entry holding the token's address.
  pub fn record_key(self) -> &'static str {
    match self {
      MintableToken::Wbtc => "wbtc",
      MintableToken::Cvx => "cvx",
    }
  }

  pub fn artifact(self) -> &'static str {
    match self {
      MintableToken::Wbtc => "WrapBitcoin",
      MintableToken::Cvx => "Convex",
    }
  }

  pub fn decimals(self) -> u8 {
    match self {
      MintableToken::Wbtc => 8,
      MintableToken::Cvx => 18,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
  pub token: MintableToken,
  pub to: Address,
  pub amount: U256,
}
