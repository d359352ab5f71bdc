// tests/pricing_tests.rs
mod common;

use alloy_primitives::{address, U256};
use common::*;
use serial_test::serial;
use stepwise::price_feed::fetch_quotes;
use stepwise::pricing::{asset_price_report, format_units, parse_units, token_amount_for_usd, token_out_per_token_in};
use stepwise::{PricingError, StaticFeed, StepwiseError, UsdPrice};

fn u256(s: &str) -> U256 {
  s.parse().unwrap()
}

#[test]
fn test_rate_for_8_decimal_token_priced_above_target() {
  let rate = token_out_per_token_in(UsdPrice::from_dollars(21), UsdPrice::from_dollars(40_000), 8).unwrap();
  assert_eq!(rate.raw(), u256("52500000000000000000000"));
}

#[test]
fn test_rate_for_stablecoin_with_6_decimals() {
  let rate = token_out_per_token_in(UsdPrice::from_dollars(21), UsdPrice::from_f64(1.0).unwrap(), 6).unwrap();
  assert_eq!(rate.raw(), parse_units(21, 24).unwrap());
}

#[test]
fn test_fractional_prices_are_floored() {
  let rate = token_out_per_token_in(UsdPrice::from_dollars(21), UsdPrice::from_f64(2500.25).unwrap(), 18).unwrap();
  assert_eq!(rate.raw(), u256("8399160083991600839916008399160083"));
}

#[test]
fn test_zero_price_never_yields_a_rate() {
  for decimals in [0u8, 6, 8, 18] {
    assert_eq!(
      token_out_per_token_in(UsdPrice::from_dollars(21), UsdPrice::from_dollars(0), decimals),
      Err(PricingError::ZeroPrice)
    );
  }
  assert_eq!(token_amount_for_usd(1_000, UsdPrice::from_dollars(0), 8), Err(PricingError::ZeroPrice));
  assert_eq!(asset_price_report(UsdPrice::from_dollars(1), UsdPrice::from_dollars(0)), Err(PricingError::ZeroPrice));
}

#[test]
fn test_usd_limit_converted_to_token_units() {
  let amount = token_amount_for_usd(100_000, UsdPrice::from_dollars(40_000), 8).unwrap();
  assert_eq!(amount, U256::from(250_000_000u64));
  assert_eq!(format_units(amount, 8), "2.5");
}

#[test]
fn test_oracle_report_is_asset_over_target_at_18_decimals() {
  let report = asset_price_report(UsdPrice::from_dollars(40_000), UsdPrice::from_dollars(21)).unwrap();
  assert_eq!(report, u256("1904761904761904761904"));
}

#[tokio::test]
#[serial]
async fn test_quotes_come_from_feed_and_missing_ones_fail() {
  setup_tracing();
  let wbtc = address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599");
  let cvx = address!("4e3fbd56cd56c3e72c1403e103b45db9da5b9d2b");
  let feed = StaticFeed::new().with_price(wbtc, 40_000.0);

  let quotes = fetch_quotes(&feed, &[(wbtc, 8)]).await.unwrap();
  assert_eq!(quotes.len(), 1);
  assert_eq!(quotes[0].decimals, 8);
  assert_eq!(quotes[0].usd_price().unwrap(), UsdPrice::from_dollars(40_000));

  let err = fetch_quotes(&feed, &[(wbtc, 8), (cvx, 18)]).await.unwrap_err();
  assert!(matches!(err, StepwiseError::PriceFeed(ref msg) if msg.contains("no USD quote")));
}

#[test]
fn test_pricing_errors_convert_into_stepwise_errors() {
  let err: StepwiseError = token_out_per_token_in(UsdPrice::from_dollars(1), UsdPrice::from_dollars(0), 8)
    .unwrap_err()
    .into();
  assert!(matches!(err, StepwiseError::Pricing(PricingError::ZeroPrice)));
}
