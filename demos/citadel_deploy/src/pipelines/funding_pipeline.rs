// citadel_deploy/src/pipelines/funding_pipeline.rs

//! `deploy-funding`: the mock deployment extended with one funding pool and
//! price oracle per accepted token, discounts, the emission schedule and a
//! first minting round.

use crate::errors::{AppError, Result as AppResult};
use crate::models::deployment::FundingPool;
use crate::pipelines::common_steps::{self, bind, timestamp_after};
use crate::pipelines::contexts::*;
use crate::pipelines::deploy_mock_pipeline;
use crate::state::AppState;
use alloy_primitives::{address, Address, U256};
use std::collections::HashMap;
use stepwise::price_feed::fetch_quotes;
use stepwise::pricing::{asset_price_report, format_units};
use stepwise::{map_sequentially, run_sequentially, Context, Contract, ContractFactory, Pipeline, PriceQuote, StepDecl};
use tracing::{event, info, instrument, Level};

pub const SCENARIO: &str = "deploy-funding";

pub const DEPLOY_FUNDINGS: &str = "deploy_fundings";
pub const ORACLE_SETUP: &str = "oracle_setup";
pub const SET_DISCOUNT: &str = "set_discount";
pub const SETUP_SCHEDULE: &str = "setup_schedule";
pub const CITADEL_MINTER_SETUP: &str = "citadel_minter_setup";

/// Second price provider registered on every oracle.
pub const TARGET_PRICE_PROVIDER: Address = address!("A967Ba66Fb284EC18bbe59f65bcf42dD11BA8128");

/// Median oracle constructor: report expiration, report delay, minimum providers.
pub const MEDIAN_ORACLE_ARGS: [u64; 3] = [10_000, 0, 1];

const DISCOUNT_LIMITS: (u64, u64) = (0, 1_000);
const DISCOUNT: u64 = 1_000;

/// Citadel emitted per epoch for the first six epochs, in wei.
pub const EPOCH_EMISSIONS: [&str; 6] = [
  "593962000000000000000000",
  "591445000000000000000000",
  "585021000000000000000000",
  "574138000000000000000000",
  "558275000000000000000000",
  "536986000000000000000000",
];

const MINTING_START_DELAY: u64 = 6;
const MINTING_FAST_FORWARD: u64 = 20 * 24 * 3600;
/// Funding, staking, locking and treasury shares, in basis points.
const DISTRIBUTION_SPLIT: [u64; 4] = [4_000, 3_000, 2_000, 1_000];
const FUNDING_POOL_WEIGHT: u64 = 5_000;

pub fn build_pipeline(app_state: &AppState) -> Pipeline<AppError> {
  let mut pipeline = deploy_mock_pipeline::build_pipeline(app_state);

  // Funding steps run before the record is stored.
  pipeline.insert_before_step(deploy_mock_pipeline::STORE_CONFIG, common_steps::token_ins_decl());
  pipeline.insert_after_step(
    common_steps::TOKEN_INS_STEP,
    StepDecl::new(DEPLOY_FUNDINGS)
      .reads(&[TOKEN_INS.name(), GAC.name(), CITADEL.name(), X_CITADEL.name(), SIGNERS.name()])
      .produces(&[FUNDINGS.name()]),
  );
  pipeline.insert_after_step(
    DEPLOY_FUNDINGS,
    StepDecl::new(ORACLE_SETUP)
      .reads(&[FUNDINGS.name(), SIGNERS.name(), DESIRED_PRICE.name()])
      .produces(&[ORACLE_REPORTS.name()]),
  );
  pipeline.insert_after_step(
    ORACLE_SETUP,
    StepDecl::new(SET_DISCOUNT).reads(&[FUNDINGS.name(), SIGNERS.name()]),
  );
  pipeline.insert_after_step(
    SET_DISCOUNT,
    StepDecl::new(SETUP_SCHEDULE)
      .reads(&[SCHEDULE.name(), SIGNERS.name()])
      .produces(&[EPOCH_RATES.name()]),
  );
  pipeline.insert_after_step(
    SETUP_SCHEDULE,
    StepDecl::new(CITADEL_MINTER_SETUP)
      .reads(&[SCHEDULE.name(), CITADEL_MINTER.name(), CITADEL.name(), SIGNERS.name(), FUNDINGS.name()])
      .produces(&[MINTING_START.name()]),
  );

  pipeline.on(common_steps::TOKEN_INS_STEP, bind(app_state, common_steps::token_ins));
  pipeline.on(DEPLOY_FUNDINGS, bind(app_state, deploy_fundings));
  pipeline.on(ORACLE_SETUP, bind(app_state, oracle_setup));
  pipeline.on(SET_DISCOUNT, bind(app_state, set_discount));
  pipeline.on(SETUP_SCHEDULE, bind(app_state, setup_schedule));
  pipeline.on(CITADEL_MINTER_SETUP, bind(app_state, citadel_minter_setup));
  pipeline
}

pub fn register_funding_pipeline(app_state: &AppState) {
  app_state.registry.register_pipeline(SCENARIO, build_pipeline(app_state));
}

/// Every funding contract in the context: the two fixed pools from the core
/// deployment first, then the per-token pools.
fn funding_contracts(ctx: &Context) -> Vec<Contract> {
  let fixed = [FUNDING_WBTC, FUNDING_CVX].into_iter().filter_map(|key| ctx.get(key).cloned());
  let registry = ctx
    .get(FUNDINGS)
    .into_iter()
    .flatten()
    .map(|pool| pool.funding.clone());
  fixed.chain(registry).collect()
}

#[instrument(name = "funding::deploy_fundings", skip_all, err)]
pub async fn deploy_fundings(state: AppState, ctx: Context) -> AppResult<Context> {
  let tokens = ctx.require(TOKEN_INS)?.clone();
  let signers = ctx.require(SIGNERS)?;
  let gac = ctx.require(GAC)?.address();
  let citadel = ctx.require(CITADEL)?.address();
  let x_citadel = ctx.require(X_CITADEL)?.address();
  let treasury_vault = signers.treasury_vault.address;

  let oracle_factory = ContractFactory::new(state.backend.clone(), "MedianOracle");
  let funding_factory = ContractFactory::new(state.backend.clone(), "Funding");

  let pools = map_sequentially(tokens, |token| {
    let oracle_factory = oracle_factory.clone();
    let funding_factory = funding_factory.clone();
    async move {
      let oracle_args = MEDIAN_ORACLE_ARGS.iter().map(|v| (*v).into()).collect();
      let oracle = oracle_factory.deploy(oracle_args).await?;
      let funding = funding_factory.deploy(vec![]).await?;
      funding
        .call(
          "initialize",
          vec![
            gac.into(),
            citadel.into(),
            token.address.into(),
            x_citadel.into(),
            treasury_vault.into(),
            oracle.address().into(),
            U256::MAX.into(),
          ],
        )
        .await?;
      info!("{} funding address is: {}", token.name, funding.address());
      Ok::<_, AppError>(FundingPool { token, funding, oracle })
    }
  })
  .await?;

  Ok(Context::new().with(FUNDINGS, pools))
}

/// Registers the keeper and the target provider on every oracle, then pushes
/// each asset's price relative to the desired CTDL price.
#[instrument(name = "funding::oracle_setup", skip_all, err)]
pub async fn oracle_setup(state: AppState, ctx: Context) -> AppResult<Context> {
  let pools = ctx.require(FUNDINGS)?;
  let keeper = &ctx.require(SIGNERS)?.keeper;
  let desired = *ctx.require(DESIRED_PRICE)?;

  run_sequentially(pools.iter(), |pool| {
    let oracle = pool.oracle.clone();
    let keeper_address = keeper.address;
    async move {
      oracle.call("addProvider", vec![keeper_address.into()]).await?;
      oracle.call("addProvider", vec![TARGET_PRICE_PROVIDER.into()]).await?;
      Ok::<_, AppError>(())
    }
  })
  .await?;

  let wanted: Vec<(Address, u8)> = pools
    .iter()
    .map(|pool| (pool.token.price_address, pool.token.decimals))
    .collect();
  let quotes: HashMap<Address, PriceQuote> = fetch_quotes(state.price_feed.as_ref(), &wanted)
    .await?
    .into_iter()
    .map(|quote| (quote.token, quote))
    .collect();

  let reports = map_sequentially(pools.iter(), |pool| {
    let oracle = pool.oracle.connect(keeper);
    let name = pool.token.name.clone();
    let quote = quotes.get(&pool.token.price_address).cloned();
    async move {
      let quote = quote.ok_or_else(|| AppError::Internal(format!("no quote fetched for {}", name)))?;
      let report = asset_price_report(quote.usd_price()?, desired)?;
      info!("Pushing Price {} for {}", report, name);
      oracle.call("pushReport", vec![report.into()]).await?;
      Ok::<_, AppError>((name, report))
    }
  })
  .await?;

  Ok(Context::new().with(ORACLE_REPORTS, reports))
}

#[instrument(name = "funding::set_discount", skip_all, err)]
pub async fn set_discount(_state: AppState, ctx: Context) -> AppResult<Context> {
  let signers = ctx.require(SIGNERS)?;
  let fundings = funding_contracts(&ctx);

  let updated = run_sequentially(fundings, |funding| {
    let as_governance = funding.connect(&signers.governance);
    let as_policy_ops = funding.connect(&signers.policy_ops);
    async move {
      as_governance
        .call("setDiscountLimits", vec![DISCOUNT_LIMITS.0.into(), DISCOUNT_LIMITS.1.into()])
        .await?;
      as_policy_ops.call("setDiscount", vec![DISCOUNT.into()]).await?;
      Ok::<_, AppError>(())
    }
  })
  .await?;

  event!(Level::INFO, updated, "Funding discounts set.");
  Ok(Context::new())
}

/// Per-second emission rate of each epoch.
pub fn epoch_rates(epoch_length: U256) -> AppResult<Vec<U256>> {
  if epoch_length.is_zero() {
    return Err(AppError::Validation("schedule reports a zero epoch length".to_string()));
  }
  EPOCH_EMISSIONS
    .iter()
    .map(|raw| {
      raw
        .parse::<U256>()
        .map(|emission| emission / epoch_length)
        .map_err(|e| AppError::Internal(format!("bad epoch emission '{}': {}", raw, e)))
    })
    .collect()
}

#[instrument(name = "funding::setup_schedule", skip_all, err)]
pub async fn setup_schedule(_state: AppState, ctx: Context) -> AppResult<Context> {
  let signers = ctx.require(SIGNERS)?;
  let schedule = ctx.require(SCHEDULE)?.connect(&signers.governance);

  let epoch_length = schedule.view_uint("epochLength", vec![]).await?;
  let rates = epoch_rates(epoch_length)?;

  run_sequentially(rates.iter().enumerate(), |(epoch, rate)| {
    let schedule = schedule.clone();
    let rate = *rate;
    async move {
      schedule
        .call("setEpochRate", vec![(epoch as u64).into(), rate.into()])
        .await?;
      Ok::<_, AppError>(())
    }
  })
  .await?;

  info!(%epoch_length, epochs = rates.len(), "Emission schedule set.");
  Ok(Context::new().with(EPOCH_RATES, rates))
}

#[instrument(name = "funding::citadel_minter_setup", skip_all, err)]
pub async fn citadel_minter_setup(state: AppState, ctx: Context) -> AppResult<Context> {
  let signers = ctx.require(SIGNERS)?;
  let schedule = ctx.require(SCHEDULE)?;
  let minter = ctx.require(CITADEL_MINTER)?.connect(&signers.policy_ops);
  let citadel = ctx.require(CITADEL)?;
  let fundings = funding_contracts(&ctx);

  let minting_start = timestamp_after(state.backend.block_timestamp().await?, MINTING_START_DELAY)?;
  schedule
    .connect(&signers.governance)
    .call("setMintingStart", vec![minting_start.into()])
    .await?;
  state
    .backend
    .set_next_block_timestamp(timestamp_after(minting_start, MINTING_FAST_FORWARD)?)
    .await?;

  minter
    .call(
      "setCitadelDistributionSplit",
      DISTRIBUTION_SPLIT.iter().map(|bps| (*bps).into()).collect(),
    )
    .await?;

  run_sequentially(fundings.iter(), |funding| {
    let minter = minter.clone();
    let pool = funding.address();
    async move {
      minter
        .call("setFundingPoolWeight", vec![pool.into(), FUNDING_POOL_WEIGHT.into()])
        .await?;
      Ok::<_, AppError>(())
    }
  })
  .await?;

  minter.call("mintAndDistribute", vec![]).await?;

  if let Some(first) = fundings.first() {
    let balance = citadel.view_uint("balanceOf", vec![first.address().into()]).await?;
    info!("Citadel balance of the first funding pool: {}", format_units(balance, 18));
  }

  Ok(Context::new().with(MINTING_START, minting_start))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn epoch_rates_divide_emissions_by_length() {
    let rates = epoch_rates(U256::from(1_000u64)).unwrap();
    assert_eq!(rates.len(), 6);
    assert_eq!(rates[0], U256::from(593_962_000_000_000_000_000u128));
    assert!(matches!(epoch_rates(U256::ZERO), Err(AppError::Validation(_))));
  }
}
