// citadel_deploy/src/models/token_in.rs

//! Tokens accepted by funding pools and knighting rounds.

use alloy_primitives::{address, Address};
use serde::Serialize;
use stepwise::StaticFeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoundPhase {
  /// Uncapped rounds opening first.
  One,
  /// Rounds capped at a USD amount, opening when phase one ends.
  Two,
}

/// A resolved token-in: where to quote it and which address to pay with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenIn {
  pub name: String,
  pub price_address: Address,
  pub address: Address,
  pub decimals: u8,
  pub phase: RoundPhase,
}

pub struct CatalogEntry {
  pub name: &'static str,
  /// Mainnet address the price feed is queried with.
  pub price_address: Address,
  /// Address paid with when no local deployment stands in for the token.
  pub mainnet_address: Address,
  pub decimals: u8,
  pub phase: RoundPhase,
  /// Context key of the local mock deployment, if the scenarios deploy one.
  pub local_instance: Option<&'static str>,
  /// Quote used by the offline price table.
  pub offline_usd: f64,
}

impl CatalogEntry {
  pub fn resolve(&self, local: Option<Address>) -> TokenIn {
    TokenIn {
      name: self.name.to_string(),
      price_address: self.price_address,
      address: local.unwrap_or(self.mainnet_address),
      decimals: self.decimals,
      phase: self.phase,
    }
  }
}

const WBTC: Address = address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599");
const RENBTC: Address = address!("eb4c2781e4eba804ce9a9803c67d0893436bb27d");
const IBBTC: Address = address!("c4e15973e6ff2a35cc804c2cf9d2a1b817a8b40f");
const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
const FRAX: Address = address!("853d955acef822db058eb8505911ed77f175b99e");
const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
const BADGER: Address = address!("3472a5a71965499acd81997a54bba8d852c6e53d");
const CVX: Address = address!("4e3fbd56cd56c3e72c1403e103b45db9da5b9d2b");
const BVECVX: Address = address!("fd05d3c7fe2924020620a8be4961bbaa747e6305");

// bveCVX has no market of its own and is quoted as CVX.
pub static CATALOG: [CatalogEntry; 9] = [
  CatalogEntry {
    name: "wBTC",
    price_address: WBTC,
    mainnet_address: WBTC,
    decimals: 8,
    phase: RoundPhase::One,
    local_instance: Some("wbtc"),
    offline_usd: 40_000.0,
  },
  CatalogEntry {
    name: "renBTC",
    price_address: RENBTC,
    mainnet_address: RENBTC,
    decimals: 8,
    phase: RoundPhase::One,
    local_instance: None,
    offline_usd: 39_950.0,
  },
  CatalogEntry {
    name: "ibBTC",
    price_address: IBBTC,
    mainnet_address: IBBTC,
    decimals: 18,
    phase: RoundPhase::One,
    local_instance: None,
    offline_usd: 40_400.0,
  },
  CatalogEntry {
    name: "WETH",
    price_address: WETH,
    mainnet_address: WETH,
    decimals: 18,
    phase: RoundPhase::One,
    local_instance: None,
    offline_usd: 3_000.0,
  },
  CatalogEntry {
    name: "FRAX",
    price_address: FRAX,
    mainnet_address: FRAX,
    decimals: 18,
    phase: RoundPhase::One,
    local_instance: None,
    offline_usd: 1.0,
  },
  CatalogEntry {
    name: "USDC",
    price_address: USDC,
    mainnet_address: USDC,
    decimals: 6,
    phase: RoundPhase::One,
    local_instance: Some("usdc"),
    offline_usd: 1.0,
  },
  CatalogEntry {
    name: "Badger",
    price_address: BADGER,
    mainnet_address: BADGER,
    decimals: 18,
    phase: RoundPhase::Two,
    local_instance: None,
    offline_usd: 10.0,
  },
  CatalogEntry {
    name: "CVX",
    price_address: CVX,
    mainnet_address: CVX,
    decimals: 18,
    phase: RoundPhase::Two,
    local_instance: Some("cvx"),
    offline_usd: 20.0,
  },
  CatalogEntry {
    name: "bveCVX",
    price_address: CVX,
    mainnet_address: BVECVX,
    decimals: 18,
    phase: RoundPhase::Two,
    local_instance: None,
    offline_usd: 20.0,
  },
];

/// Price feed answering every catalog token from its offline quote.
pub fn offline_feed() -> StaticFeed {
  CATALOG
    .iter()
    .fold(StaticFeed::new(), |feed, entry| feed.with_price(entry.price_address, entry.offline_usd))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolve_prefers_local_deployment() {
    let local = Address::repeat_byte(0x11);
    let wbtc = CATALOG[0].resolve(Some(local));
    assert_eq!(wbtc.address, local);
    assert_eq!(wbtc.price_address, WBTC);

    let bve = CATALOG[8].resolve(None);
    assert_eq!(bve.address, BVECVX);
    assert_eq!(bve.price_address, CVX);
  }

  #[test]
  fn phases_split_six_and_three() {
    let phase_one = CATALOG.iter().filter(|e| e.phase == RoundPhase::One).count();
    assert_eq!(phase_one, 6);
    assert_eq!(CATALOG.len() - phase_one, 3);
  }
}
