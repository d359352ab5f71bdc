// citadel_deploy/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::token_in;
use alloy_primitives::U256;
use std::sync::Arc;
use stepwise::{CoinGeckoFeed, MockBackend, PriceFeed, Registry, SharedBackend, Token};

/// Epoch length answered by the in-memory chain (21 days).
pub const MOCK_EPOCH_LENGTH: u64 = 21 * 24 * 3600;

#[derive(Clone)]
pub struct AppState {
  pub backend: SharedBackend,
  pub price_feed: Arc<dyn PriceFeed>,
  pub registry: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// State backed by a fresh in-memory chain. The returned mock handle shares
  /// that chain, for inspection.
  pub fn with_mock_chain(config: AppConfig) -> (Self, Arc<MockBackend>) {
    let price_feed: Arc<dyn PriceFeed> = if config.offline_prices {
      Arc::new(token_in::offline_feed())
    } else {
      Arc::new(CoinGeckoFeed::new(config.price_api_url.clone()))
    };
    Self::with_price_feed(config, price_feed)
  }

  pub fn with_price_feed(config: AppConfig, price_feed: Arc<dyn PriceFeed>) -> (Self, Arc<MockBackend>) {
    let mock = Arc::new(MockBackend::new());
    mock.script_default_view("epochLength", Token::Uint(U256::from(MOCK_EPOCH_LENGTH)));
    let backend: SharedBackend = mock.clone();
    let state = Self {
      backend,
      price_feed,
      registry: Arc::new(Registry::new()),
      config: Arc::new(config),
    };
    (state, mock)
  }
}
