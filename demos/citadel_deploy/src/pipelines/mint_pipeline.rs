// citadel_deploy/src/pipelines/mint_pipeline.rs

//! `mint`: mints a mock token from a stored deployment record to an address.

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::common_steps::{bind, log_progress};
use crate::pipelines::contexts::*;
use crate::state::AppState;
use stepwise::pricing::format_units;
use std::io::ErrorKind;
use std::path::Path;
use stepwise::record;
use stepwise::{Context, ContractFactory, DeploymentRecord, Pipeline, StepDecl, StepwiseError};
use tracing::{info, instrument};

pub const SCENARIO: &str = "mint";

pub const LOAD_DEPLOYMENT_RECORD: &str = "load_deployment_record";
pub const MINT_TOKENS: &str = "mint_tokens";

pub fn build_pipeline(app_state: &AppState) -> Pipeline<AppError> {
  let mut pipeline = Pipeline::<AppError>::new(&[
    StepDecl::new(LOAD_DEPLOYMENT_RECORD)
      .reads(&[BASE_PATH.name(), CONFIG_FILE.name()])
      .produces(&[DEPLOYMENT_RECORD.name()]),
    StepDecl::new(MINT_TOKENS)
      .reads(&[DEPLOYMENT_RECORD.name(), MINT_REQUEST.name()])
      .produces(&[MINTED_BALANCE.name()]),
    StepDecl::new("log_minted").optional(),
  ]);

  pipeline.on(LOAD_DEPLOYMENT_RECORD, bind(app_state, load_deployment_record));
  pipeline.on(MINT_TOKENS, bind(app_state, mint_tokens));
  pipeline.observe("log_minted", log_progress("Mint task done ..."));
  pipeline
}

pub fn register_mint_pipeline(app_state: &AppState) {
  app_state.registry.register_pipeline(SCENARIO, build_pipeline(app_state));
}

#[instrument(name = "mint::load_deployment_record", skip_all, err)]
pub async fn load_deployment_record(_state: AppState, ctx: Context) -> AppResult<Context> {
  let base_path = ctx.require(BASE_PATH)?;
  let config_file = ctx.require(CONFIG_FILE)?;
  let deployment = load_record(base_path, config_file)?;
  Ok(Context::new().with(DEPLOYMENT_RECORD, deployment))
}

/// Loads the stored record, turning a missing file into a hint to deploy
/// first.
pub fn load_record(base_path: &Path, config_file: &str) -> AppResult<DeploymentRecord> {
  match record::load(base_path, config_file) {
    Err(StepwiseError::Io(e)) if e.kind() == ErrorKind::NotFound => Err(AppError::Config(format!(
      "no deployment record at {}; run deploy-mock first",
      record::record_path(base_path, config_file).display()
    ))),
    other => Ok(other?),
  }
}

#[instrument(name = "mint::mint_tokens", skip_all, err)]
pub async fn mint_tokens(state: AppState, ctx: Context) -> AppResult<Context> {
  let deployment = ctx.require(DEPLOYMENT_RECORD)?;
  let request = ctx.require(MINT_REQUEST)?;
  if request.amount.is_zero() {
    return Err(AppError::Validation("mint amount must be greater than zero".to_string()));
  }

  let token_address = deployment.require(request.token.record_key())?;
  let token = ContractFactory::new(state.backend.clone(), request.token.artifact()).attach(token_address);

  info!("Minting {} to {}", format_units(request.amount, request.token.decimals()), request.to);
  token
    .call("mint", vec![request.to.into(), request.amount.into()])
    .await?;

  let balance = token.view_uint("balanceOf", vec![request.to.into()]).await?;
  info!(
    "{} balance of {}: {}",
    request.token.artifact(),
    request.to,
    format_units(balance, request.token.decimals())
  );
  Ok(Context::new().with(MINTED_BALANCE, balance))
}
