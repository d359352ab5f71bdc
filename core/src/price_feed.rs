// stepwise/src/price_feed.rs

//! USD price lookups for input tokens.

use crate::error::{StepwiseError, StepwiseResult};
use crate::pricing::PriceQuote;
use alloy_primitives::Address;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{event, instrument, Level};

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Source of current USD prices, keyed by the token's mainnet address.
#[async_trait]
pub trait PriceFeed: Send + Sync {
  /// Prices for as many of `tokens` as the source knows. Unknown tokens are
  /// simply absent from the map.
  async fn usd_prices(&self, tokens: &[Address]) -> StepwiseResult<HashMap<Address, f64>>;
}

/// Quotes every `(price_address, decimals)` pair, failing if any is missing.
pub async fn fetch_quotes(feed: &dyn PriceFeed, tokens: &[(Address, u8)]) -> StepwiseResult<Vec<PriceQuote>> {
  let mut addresses: Vec<Address> = tokens.iter().map(|(a, _)| *a).collect();
  addresses.sort();
  addresses.dedup();
  let prices = feed.usd_prices(&addresses).await?;

  tokens
    .iter()
    .map(|(token, decimals)| {
      prices
        .get(token)
        .map(|usd| PriceQuote {
          token: *token,
          decimals: *decimals,
          usd: *usd,
        })
        .ok_or_else(|| StepwiseError::PriceFeed(format!("no USD quote for {}", token)))
    })
    .collect()
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
  usd: Option<f64>,
}

/// Turns a `simple/token_price` response into prices for the `requested`
/// tokens. Keys are matched case-insensitively; entries without a USD price
/// or for tokens nobody asked about are dropped.
pub fn parse_token_prices(
  status: StatusCode,
  body: &[u8],
  requested: &[Address],
) -> StepwiseResult<HashMap<Address, f64>> {
  if !status.is_success() {
    let snippet: String = String::from_utf8_lossy(body).chars().take(200).collect();
    return Err(StepwiseError::PriceFeed(format!(
      "price API answered {}: {}",
      status, snippet
    )));
  }

  let quotes: HashMap<String, UsdQuote> = serde_json::from_slice(body)?;
  let mut prices = HashMap::with_capacity(quotes.len());
  for (raw_address, quote) in quotes {
    let address = Address::from_str(&raw_address.to_lowercase())
      .map_err(|e| StepwiseError::PriceFeed(format!("unparseable address '{}' in response: {}", raw_address, e)))?;
    if !requested.contains(&address) {
      event!(Level::DEBUG, %address, "Ignoring quote for a token that was not requested.");
      continue;
    }
    match quote.usd {
      Some(usd) => {
        prices.insert(address, usd);
      }
      None => event!(Level::WARN, %address, "Price feed returned an entry without a USD price."),
    }
  }
  Ok(prices)
}

/// CoinGecko `simple/token_price` client.
#[derive(Debug, Clone)]
pub struct CoinGeckoFeed {
  client: reqwest::Client,
  base_url: String,
}

impl CoinGeckoFeed {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
    }
  }

  fn endpoint(&self) -> String {
    format!("{}/simple/token_price/ethereum", self.base_url)
  }
}

impl Default for CoinGeckoFeed {
  fn default() -> Self {
    Self::new(COINGECKO_API_URL)
  }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
  #[instrument(name = "CoinGeckoFeed::usd_prices", skip_all, fields(tokens = tokens.len()), err(Display))]
  async fn usd_prices(&self, tokens: &[Address]) -> StepwiseResult<HashMap<Address, f64>> {
    let contract_addresses = tokens
      .iter()
      .map(|a| a.to_string().to_lowercase())
      .collect::<Vec<_>>()
      .join(",");

    let response = self
      .client
      .get(self.endpoint())
      .query(&[("contract_addresses", contract_addresses.as_str()), ("vs_currencies", "usd")])
      .send()
      .await?;
    let status = response.status();
    let body = response.bytes().await?;

    let prices = parse_token_prices(status, &body, tokens)?;
    event!(Level::DEBUG, quoted = prices.len(), "Fetched USD prices.");
    Ok(prices)
  }
}

/// Fixed prices, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
  prices: HashMap<Address, f64>,
}

impl StaticFeed {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_price(mut self, token: Address, usd: f64) -> Self {
    self.prices.insert(token, usd);
    self
  }
}

#[async_trait]
impl PriceFeed for StaticFeed {
  async fn usd_prices(&self, tokens: &[Address]) -> StepwiseResult<HashMap<Address, f64>> {
    Ok(
      tokens
        .iter()
        .filter_map(|t| self.prices.get(t).map(|usd| (*t, *usd)))
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use alloy_primitives::address;

  const WBTC: Address = address!("2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599");
  const CVX: Address = address!("4e3FBD56CD56c3e72c1403e103b45Db9da5B9D2B");

  #[test]
  fn address_keyed_body_is_parsed() {
    let body = br#"{
      "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599": { "usd": 40123.5 },
      "0x4e3fbd56cd56c3e72c1403e103b45db9da5b9d2b": { "usd": 20.1 }
    }"#;
    let prices = parse_token_prices(StatusCode::OK, body, &[WBTC, CVX]).unwrap();
    assert_eq!(prices.len(), 2);
    assert_eq!(prices[&WBTC], 40123.5);
    assert_eq!(prices[&CVX], 20.1);
  }

  #[test]
  fn entry_without_usd_is_dropped() {
    let body = br#"{
      "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599": {},
      "0x4e3fbd56cd56c3e72c1403e103b45db9da5b9d2b": { "usd": 20.1 }
    }"#;
    let prices = parse_token_prices(StatusCode::OK, body, &[WBTC, CVX]).unwrap();
    assert!(!prices.contains_key(&WBTC));
    assert_eq!(prices.len(), 1);
  }

  #[test]
  fn keys_match_regardless_of_case_and_unrequested_tokens_are_ignored() {
    let body = br#"{
      "0x2260FAC5E5542A773AA44FBCFEDF7C193BC2C599": { "usd": 40000 },
      "0x4e3fbd56cd56c3e72c1403e103b45db9da5b9d2b": { "usd": 20 }
    }"#;
    let prices = parse_token_prices(StatusCode::OK, body, &[WBTC]).unwrap();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[&WBTC], 40000.0);
  }

  #[test]
  fn malformed_key_or_body_is_an_error() {
    let bad_key = br#"{ "wbtc": { "usd": 1 } }"#;
    assert!(matches!(
      parse_token_prices(StatusCode::OK, bad_key, &[WBTC]),
      Err(StepwiseError::PriceFeed(_))
    ));
    assert!(matches!(
      parse_token_prices(StatusCode::OK, b"[1, 2]", &[WBTC]),
      Err(StepwiseError::Json(_))
    ));
  }

  #[test]
  fn non_success_status_is_reported_with_body() {
    let result = parse_token_prices(StatusCode::TOO_MANY_REQUESTS, br#"{"status":{"error_code":429}}"#, &[WBTC]);
    match result {
      Err(StepwiseError::PriceFeed(message)) => {
        assert!(message.contains("429"));
        assert!(message.contains("error_code"));
      }
      other => panic!("expected a price feed error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn missing_quote_fails_fetch() {
    let feed = StaticFeed::new().with_price(WBTC, 40_000.0);
    let result = fetch_quotes(&feed, &[(WBTC, 8), (CVX, 18)]).await;
    assert!(matches!(result, Err(StepwiseError::PriceFeed(_))));
  }
}
