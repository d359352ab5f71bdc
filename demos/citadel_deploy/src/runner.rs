// citadel_deploy/src/runner.rs

//! Builds each scenario's initial context and runs it through the registry.

use crate::errors::{AppError, Result as AppResult};
use crate::models::deployment::MintRequest;
use crate::pipelines::contexts::*;
use crate::pipelines::{deploy_mock_pipeline, funding_pipeline, knighting_round_pipeline, mint_pipeline, user_journey_pipeline};
use crate::state::AppState;
use alloy_primitives::{address, Address};
use stepwise::{Context, MockBackend, UsdPrice};
use tracing::{info, instrument};

/// CTDL token used by knighting rounds when none is given.
pub const DEFAULT_CITADEL_ADDRESS: Address = address!("E8addD62feD354203d079926a8e563BC1A7FE81e");

async fn account(state: &AppState, index: usize) -> AppResult<Address> {
  state
    .backend
    .accounts()
    .await?
    .get(index)
    .copied()
    .ok_or_else(|| AppError::Validation(format!("backend has no account #{}", index)))
}

fn desired_price(state: &AppState) -> UsdPrice {
  UsdPrice::from_dollars(state.config.desired_price_usd)
}

/// Inputs shared by `deploy-mock` and `deploy-funding`.
pub async fn deploy_context(state: &AppState) -> AppResult<Context> {
  Ok(
    Context::new()
      .with(MINT_TO, account(state, 0).await?)
      .with(X_CITADEL_FEES, [0u64; 4])
      .with(BASE_PATH, state.config.scripts_data_dir.clone())
      .with(CONFIG_FILE, state.config.mock_config_name())
      .with(DESIRED_PRICE, desired_price(state)),
  )
}

pub async fn knighting_context(
  state: &AppState,
  citadel: Option<Address>,
  multisig: Option<Address>,
) -> AppResult<Context> {
  let multisig = match multisig {
    Some(address) => address,
    None => account(state, 2).await?,
  };
  Ok(
    Context::new()
      .with(CITADEL_ADDRESS, citadel.unwrap_or(DEFAULT_CITADEL_ADDRESS))
      .with(MULTISIG, multisig)
      .with(DESIRED_PRICE, desired_price(state)),
  )
}

pub fn mint_context(state: &AppState, request: MintRequest) -> Context {
  Context::new()
    .with(BASE_PATH, state.config.scripts_data_dir.clone())
    .with(CONFIG_FILE, state.config.mock_config_name())
    .with(MINT_REQUEST, request)
}

#[instrument(skip(state), err)]
pub async fn deploy_mock(state: &AppState) -> AppResult<Context> {
  let initial = deploy_context(state).await?;
  state.registry.run(deploy_mock_pipeline::SCENARIO, initial).await
}

#[instrument(skip(state), err)]
pub async fn deploy_funding(state: &AppState) -> AppResult<Context> {
  let initial = deploy_context(state).await?;
  state.registry.run(funding_pipeline::SCENARIO, initial).await
}

/// The funding deployment, then a user bonding, vesting and locking against it.
#[instrument(skip(state), err)]
pub async fn user_journey(state: &AppState) -> AppResult<Context> {
  let initial = deploy_context(state).await?;
  state.registry.run(user_journey_pipeline::SCENARIO, initial).await
}

/// Every signing account the backend exposes, in order.
pub async fn accounts(state: &AppState) -> AppResult<Vec<Address>> {
  Ok(state.backend.accounts().await?)
}

#[instrument(skip(state), err)]
pub async fn knighting_rounds(state: &AppState, citadel: Option<Address>, multisig: Option<Address>) -> AppResult<Context> {
  let initial = knighting_context(state, citadel, multisig).await?;
  state.registry.run(knighting_round_pipeline::SCENARIO, initial).await
}

/// Mints from the stored deployment record. Fails with a config error when
/// no record has been written yet.
#[instrument(skip(state), err)]
pub async fn mint(state: &AppState, request: MintRequest) -> AppResult<Context> {
  state
    .registry
    .run(mint_pipeline::SCENARIO, mint_context(state, request))
    .await
}

/// A fresh in-memory chain holds none of the recorded contracts. Installs the
/// requested token at its recorded address so `mint` can reach it.
pub fn install_recorded_token(state: &AppState, chain: &MockBackend, request: &MintRequest) -> AppResult<Address> {
  let deployment = mint_pipeline::load_record(&state.config.scripts_data_dir, &state.config.mock_config_name())?;
  let address = deployment.require(request.token.record_key())?;
  chain.install_code(address, request.token.artifact());
  info!(%address, artifact = request.token.artifact(), "Recorded token installed on the in-memory chain.");
  Ok(address)
}
