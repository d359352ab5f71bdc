// citadel_deploy/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use stepwise::price_feed::COINGECKO_API_URL;

#[derive(Debug, Clone)]
pub struct AppConfig {
  /// Used to name the stored deployment record.
  pub network_name: String,
  pub scripts_data_dir: PathBuf,
  pub price_api_url: String,
  /// Target CTDL price in whole dollars.
  pub desired_price_usd: u64,
  /// Quote prices from the built-in table instead of the HTTP feed.
  pub offline_prices: bool,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      network_name: "hardhat".to_string(),
      scripts_data_dir: PathBuf::from("scripts-data"),
      price_api_url: COINGECKO_API_URL.to_string(),
      desired_price_usd: 21,
      offline_prices: false,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let defaults = Self::default();
    let get_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());

    let network_name = get_env("NETWORK_NAME").unwrap_or(defaults.network_name);
    let scripts_data_dir = get_env("SCRIPTS_DATA_DIR")
      .map(PathBuf::from)
      .unwrap_or(defaults.scripts_data_dir);
    let price_api_url = get_env("PRICE_API_URL").unwrap_or(defaults.price_api_url);

    let desired_price_usd = match get_env("DESIRED_PRICE_USD") {
      Some(raw) => raw
        .parse::<u64>()
        .map_err(|e| AppError::Config(format!("Invalid DESIRED_PRICE_USD '{}': {}", raw, e)))?,
      None => defaults.desired_price_usd,
    };
    if desired_price_usd == 0 {
      return Err(AppError::Config("DESIRED_PRICE_USD must be greater than zero".to_string()));
    }

    let offline_prices = match get_env("OFFLINE_PRICES") {
      Some(raw) => raw
        .parse::<bool>()
        .map_err(|e| AppError::Config(format!("Invalid OFFLINE_PRICES value '{}': {}", raw, e)))?,
      None => defaults.offline_prices,
    };

    tracing::info!(%network_name, offline_prices, "Application configuration loaded successfully.");

    Ok(Self {
      network_name,
      scripts_data_dir,
      price_api_url,
      desired_price_usd,
      offline_prices,
    })
  }

  /// Name of the JSON record written by the mock deployment.
  pub fn mock_config_name(&self) -> String {
    format!("{}-mock-config", self.network_name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mock_config_name_follows_network() {
    let config = AppConfig {
      network_name: "goerli".to_string(),
      ..AppConfig::default()
    };
    assert_eq!(config.mock_config_name(), "goerli-mock-config");
    assert_eq!(AppConfig::default().desired_price_usd, 21);
  }
}
