// stepwise/src/pricing.rs

//! Fixed-point price conversion.
//!
//! USD prices enter as floats, are scaled once to [`USD_PRICE_DECIMALS`] and
//! from then on all arithmetic is checked `U256` integer math. Exchange rates
//! come out at [`RATE_DECIMALS`].

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Decimal places a [`UsdPrice`] is stored with.
pub const USD_PRICE_DECIMALS: u8 = 8;

/// Decimal places of an [`ExchangeRate`]; also the native token's decimals.
pub const RATE_DECIMALS: u8 = 18;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
  #[error("price is zero")]
  ZeroPrice,

  #[error("invalid USD price {value}: {reason}")]
  InvalidPrice { value: String, reason: &'static str },

  #[error("fixed-point overflow while computing {what}")]
  Overflow { what: &'static str },
}

/// A USD price scaled by `10^USD_PRICE_DECIMALS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsdPrice(U256);

impl UsdPrice {
  /// Scales a float price, rounding to the nearest representable value.
  ///
  /// NaN, infinities and negative prices are rejected. Prices that round to
  /// zero are accepted here and rejected by the conversions that divide by them.
  pub fn from_f64(usd: f64) -> Result<Self, PricingError> {
    if !usd.is_finite() {
      return Err(PricingError::InvalidPrice {
        value: usd.to_string(),
        reason: "not a finite number",
      });
    }
    if usd < 0.0 {
      return Err(PricingError::InvalidPrice {
        value: usd.to_string(),
        reason: "negative",
      });
    }
    let scaled = (usd * 10f64.powi(i32::from(USD_PRICE_DECIMALS))).round();
    if scaled >= u128::MAX as f64 {
      return Err(PricingError::Overflow { what: "USD price scaling" });
    }
    Ok(Self(U256::from(scaled as u128)))
  }

  /// Whole dollars, e.g. `UsdPrice::from_dollars(21)`.
  pub fn from_dollars(dollars: u64) -> Self {
    // 2^64 * 10^8 fits comfortably in 256 bits
    Self(U256::from(dollars) * U256::from(10u64.pow(u32::from(USD_PRICE_DECIMALS))))
  }

  /// Wraps a value already scaled by `10^USD_PRICE_DECIMALS`.
  pub fn from_scaled(raw: U256) -> Self {
    Self(raw)
  }

  pub fn raw(&self) -> U256 {
    self.0
  }

  pub fn is_zero(&self) -> bool {
    self.0.is_zero()
  }
}

impl fmt::Display for UsdPrice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "${}", format_units(self.0, USD_PRICE_DECIMALS))
  }
}

/// Native-token smallest units per smallest unit of an input token, scaled by
/// `10^RATE_DECIMALS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeRate(U256);

impl ExchangeRate {
  pub fn raw(&self) -> U256 {
    self.0
  }
}

impl fmt::Display for ExchangeRate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<ExchangeRate> for U256 {
  fn from(rate: ExchangeRate) -> Self {
    rate.0
  }
}

/// Current USD price of one whole input token, as fetched from a price feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
  pub token: Address,
  pub decimals: u8,
  pub usd: f64,
}

impl PriceQuote {
  pub fn usd_price(&self) -> Result<UsdPrice, PricingError> {
    UsdPrice::from_f64(self.usd)
  }
}

/// `10^exp`, or `Overflow` once it no longer fits in 256 bits.
pub fn pow10(exp: u32) -> Result<U256, PricingError> {
  let ten = U256::from(10u64);
  (0..exp).try_fold(U256::from(1u64), |acc, _| {
    acc.checked_mul(ten).ok_or(PricingError::Overflow { what: "power of ten" })
  })
}

/// `amount * 10^decimals`, like ethers' `parseUnits` for whole amounts.
pub fn parse_units(amount: u64, decimals: u8) -> Result<U256, PricingError> {
  U256::from(amount)
    .checked_mul(pow10(u32::from(decimals))?)
    .ok_or(PricingError::Overflow { what: "unit parsing" })
}

/// Renders a fixed-point integer with `decimals` places, trimming trailing
/// zeros but always keeping one fractional digit ("1.0", "0.05").
pub fn format_units(value: U256, decimals: u8) -> String {
  let digits = value.to_string();
  let decimals = usize::from(decimals);
  if decimals == 0 {
    return digits;
  }
  let padded = format!("{:0>width$}", digits, width = decimals + 1);
  let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
  let frac_trimmed = frac_part.trim_end_matches('0');
  let frac = if frac_trimmed.is_empty() { "0" } else { frac_trimmed };
  format!("{}.{}", int_part, frac)
}

/// How much native token one smallest unit of an input token buys when the
/// native token should sell at `desired` and the input token trades at `price`.
///
/// Computes `floor(desired * 10^(RATE_DECIMALS + decimals) / price)`. Both
/// prices carry the same scale, so it cancels out.
pub fn token_out_per_token_in(desired: UsdPrice, price: UsdPrice, decimals: u8) -> Result<ExchangeRate, PricingError> {
  if price.is_zero() {
    return Err(PricingError::ZeroPrice);
  }
  let scale = pow10(u32::from(RATE_DECIMALS) + u32::from(decimals))?;
  let numerator = desired
    .raw()
    .checked_mul(scale)
    .ok_or(PricingError::Overflow { what: "exchange rate" })?;
  numerator
    .checked_div(price.raw())
    .map(ExchangeRate)
    .ok_or(PricingError::ZeroPrice)
}

/// Smallest units of an input token worth `usd_limit` whole dollars at
/// `price`. Used for per-round USD caps.
pub fn token_amount_for_usd(usd_limit: u64, price: UsdPrice, decimals: u8) -> Result<U256, PricingError> {
  if price.is_zero() {
    return Err(PricingError::ZeroPrice);
  }
  let scale = pow10(u32::from(decimals) + u32::from(USD_PRICE_DECIMALS))?;
  let numerator = U256::from(usd_limit)
    .checked_mul(scale)
    .ok_or(PricingError::Overflow { what: "USD limit" })?;
  numerator.checked_div(price.raw()).ok_or(PricingError::ZeroPrice)
}

/// Value reported to a median oracle: how many native tokens (18 decimals)
/// one whole asset is worth, given the asset's price and the native token's
/// target price.
pub fn asset_price_report(asset: UsdPrice, target: UsdPrice) -> Result<U256, PricingError> {
  if target.is_zero() {
    return Err(PricingError::ZeroPrice);
  }
  let numerator = asset
    .raw()
    .checked_mul(pow10(u32::from(RATE_DECIMALS))?)
    .ok_or(PricingError::Overflow { what: "oracle report" })?;
  numerator.checked_div(target.raw()).ok_or(PricingError::ZeroPrice)
}
