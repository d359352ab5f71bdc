// citadel_deploy/src/pipelines/user_journey_pipeline.rs

//! `user-journey`: the funding deployment followed by what a user and the
//! operators do with it. The user bonds wBTC and CVX for xCTDL, starts
//! vesting, locks xCTDL across several epochs, and the keeper moves prices.

use crate::errors::{AppError, Result as AppResult};
use crate::models::deployment::BondAmounts;
use crate::pipelines::common_steps::bind;
use crate::pipelines::contexts::*;
use crate::pipelines::{deploy_mock_pipeline, funding_pipeline};
use crate::state::AppState;
use alloy_primitives::{Address, U256};
use stepwise::pricing::{format_units, parse_units};
use stepwise::{Context, Contract, ContractFactory, Pipeline, Signer, StepDecl, Token};
use tracing::{info, instrument};

pub const SCENARIO: &str = "user-journey";

pub const SET_X_CITADEL_STRATEGY: &str = "set_x_citadel_strategy";
pub const APPROVE_FUNDING_TOKENS: &str = "approve_funding_tokens";
pub const MEDIAN_ORACLE_UPDATE_PRICE: &str = "median_oracle_update_price";
pub const BOND_TOKEN_FOR_X_CITADEL: &str = "bond_token_for_x_citadel";
pub const X_CITADEL_VESTING: &str = "x_citadel_vesting";
pub const SET_MOCK_FUNDING_PRICE: &str = "set_mock_funding_price";

const DAY: u64 = 24 * 3600;
const WEEK: u64 = 7 * DAY;

/// Keeper report pushed to both fixed-pool oracles.
pub const KEEPER_PRICE_REPORT: u64 = 5_000 + 600;
/// Bond slippage tolerance.
const BOND_SLIPPAGE: u64 = 0;
/// Min and max citadel price in asset accepted by the wBTC pool.
pub const WBTC_PRICE_BOUNDS: (u64, u64) = (5_000, 200_000);
pub const WBTC_CITADEL_PRICE: u64 = 10_000;

pub fn build_pipeline(app_state: &AppState) -> Pipeline<AppError> {
  let mut pipeline = funding_pipeline::build_pipeline(app_state);

  pipeline.insert_before_step(
    funding_pipeline::CITADEL_MINTER_SETUP,
    StepDecl::new(SET_X_CITADEL_STRATEGY)
      .reads(&[X_CITADEL.name(), CITADEL.name(), SIGNERS.name()])
      .produces(&[X_CITADEL_STRATEGY.name()]),
  );

  // The user's actions run once minting has started, before the record is stored.
  let journey = [
    StepDecl::new(APPROVE_FUNDING_TOKENS)
      .reads(&[MINT_TO.name(), WBTC.name(), CVX.name(), FUNDING_WBTC.name(), FUNDING_CVX.name()])
      .produces(&[BOND_AMOUNTS.name()]),
    StepDecl::new(MEDIAN_ORACLE_UPDATE_PRICE)
      .reads(&[SIGNERS.name(), FUNDING_WBTC.name(), FUNDING_CVX.name()])
      .produces(&[MEDIAN_ORACLE_WBTC.name(), MEDIAN_ORACLE_CVX.name()]),
    StepDecl::new(BOND_TOKEN_FOR_X_CITADEL).reads(&[
      MINT_TO.name(),
      BOND_AMOUNTS.name(),
      WBTC.name(),
      CVX.name(),
      FUNDING_WBTC.name(),
      FUNDING_CVX.name(),
      X_CITADEL.name(),
    ]),
    StepDecl::new(X_CITADEL_VESTING)
      .reads(&[
        MINT_TO.name(),
        SIGNERS.name(),
        X_CITADEL.name(),
        X_CITADEL_VESTER.name(),
        X_CITADEL_LOCKER.name(),
        CITADEL.name(),
        CITADEL_MINTER.name(),
      ])
      .produces(&[LOCKED_X_CITADEL.name(), VESTING_END.name()]),
    StepDecl::new(SET_MOCK_FUNDING_PRICE).reads(&[SIGNERS.name(), FUNDING_WBTC.name()]),
  ];
  for decl in journey {
    pipeline.insert_before_step(deploy_mock_pipeline::STORE_CONFIG, decl);
  }

  pipeline.on(SET_X_CITADEL_STRATEGY, bind(app_state, set_x_citadel_strategy));
  pipeline.on(APPROVE_FUNDING_TOKENS, bind(app_state, approve_funding_tokens));
  pipeline.on(MEDIAN_ORACLE_UPDATE_PRICE, bind(app_state, median_oracle_update_price));
  pipeline.on(BOND_TOKEN_FOR_X_CITADEL, bind(app_state, bond_token_for_x_citadel));
  pipeline.on(X_CITADEL_VESTING, bind(app_state, x_citadel_vesting));
  pipeline.on(SET_MOCK_FUNDING_PRICE, bind(app_state, set_mock_funding_price));
  pipeline
}

pub fn register_user_journey_pipeline(app_state: &AppState) {
  app_state.registry.register_pipeline(SCENARIO, build_pipeline(app_state));
}

/// The account that received the mock mints acts as the user.
fn user(ctx: &Context) -> AppResult<Signer> {
  Ok(Signer::new("user", *ctx.require(MINT_TO)?))
}

#[instrument(name = "journey::set_x_citadel_strategy", skip_all, err)]
pub async fn set_x_citadel_strategy(state: AppState, ctx: Context) -> AppResult<Context> {
  let governance = &ctx.require(SIGNERS)?.governance;
  let x_citadel = ctx.require(X_CITADEL)?;
  let citadel = ctx.require(CITADEL)?.address();

  let strategy = ContractFactory::new(state.backend.clone(), "BrickedStrategy")
    .deploy(vec![])
    .await?;
  strategy
    .connect(governance)
    .call("initialize", vec![x_citadel.address().into(), citadel.into()])
    .await?;
  x_citadel
    .connect(governance)
    .call("setStrategy", vec![strategy.address().into()])
    .await?;

  info!("xCitadel strategy address is: {}", strategy.address());
  Ok(Context::new().with(X_CITADEL_STRATEGY, strategy))
}

#[instrument(name = "journey::approve_funding_tokens", skip_all, err)]
pub async fn approve_funding_tokens(_state: AppState, ctx: Context) -> AppResult<Context> {
  let user = user(&ctx)?;
  let amounts = BondAmounts {
    wbtc: parse_units(1, 8)?,
    cvx: parse_units(1_000, 18)?,
  };

  ctx
    .require(WBTC)?
    .connect(&user)
    .call("approve", vec![ctx.require(FUNDING_WBTC)?.address().into(), amounts.wbtc.into()])
    .await?;
  // CVX is approved from the default sender.
  ctx
    .require(CVX)?
    .call("approve", vec![ctx.require(FUNDING_CVX)?.address().into(), amounts.cvx.into()])
    .await?;

  info!(wbtc = %amounts.wbtc, cvx = %amounts.cvx, "Funding tokens approved.");
  Ok(Context::new().with(BOND_AMOUNTS, amounts))
}

/// Gives each fixed pool a median oracle fed by the keeper, pushes a report to
/// both and has the pools pick the new price up.
#[instrument(name = "journey::median_oracle_update_price", skip_all, err)]
pub async fn median_oracle_update_price(state: AppState, ctx: Context) -> AppResult<Context> {
  let keeper = &ctx.require(SIGNERS)?.keeper;
  let oracle_factory = ContractFactory::new(state.backend.clone(), "MedianOracle");
  let oracle_args = || -> Vec<Token> { funding_pipeline::MEDIAN_ORACLE_ARGS.iter().map(|v| (*v).into()).collect() };

  let wbtc_oracle = oracle_factory.deploy(oracle_args()).await?;
  let cvx_oracle = oracle_factory.deploy(oracle_args()).await?;
  for oracle in [&wbtc_oracle, &cvx_oracle] {
    oracle.call("addProvider", vec![keeper.address.into()]).await?;
  }
  for oracle in [&wbtc_oracle, &cvx_oracle] {
    oracle
      .connect(keeper)
      .call("pushReport", vec![KEEPER_PRICE_REPORT.into()])
      .await?;
  }
  for funding in [ctx.require(FUNDING_WBTC)?, ctx.require(FUNDING_CVX)?] {
    funding.connect(keeper).call("updateCitadelPerAsset", vec![]).await?;
  }

  Ok(
    Context::new()
      .with(MEDIAN_ORACLE_WBTC, wbtc_oracle)
      .with(MEDIAN_ORACLE_CVX, cvx_oracle),
  )
}

/// Approves `funding` for `amount` of `token` and deposits it.
async fn bond(user: &Signer, funding: &Contract, token: &Contract, amount: U256) -> AppResult<()> {
  token
    .connect(user)
    .call("approve", vec![funding.address().into(), amount.into()])
    .await?;
  funding
    .connect(user)
    .call("deposit", vec![amount.into(), BOND_SLIPPAGE.into()])
    .await?;
  Ok(())
}

#[instrument(name = "journey::bond_token_for_x_citadel", skip_all, err)]
pub async fn bond_token_for_x_citadel(_state: AppState, ctx: Context) -> AppResult<Context> {
  let user = user(&ctx)?;
  let amounts = ctx.require(BOND_AMOUNTS)?;

  bond(&user, ctx.require(FUNDING_WBTC)?, ctx.require(WBTC)?, amounts.wbtc).await?;
  bond(&user, ctx.require(FUNDING_CVX)?, ctx.require(CVX)?, amounts.cvx).await?;

  let balance = ctx
    .require(X_CITADEL)?
    .view_uint("balanceOf", vec![user.address.into()])
    .await?;
  info!("balance of xCTDL after two deposits: {}", format_units(balance, 18));
  Ok(Context::new())
}

/// Withdraws xCTDL into vesting, claims part of it ten days later, then locks
/// xCTDL twice across checkpointed epochs.
#[instrument(name = "journey::x_citadel_vesting", skip_all, err)]
pub async fn x_citadel_vesting(state: AppState, ctx: Context) -> AppResult<Context> {
  let user = user(&ctx)?;
  let policy_ops = &ctx.require(SIGNERS)?.policy_ops;
  let x_citadel = ctx.require(X_CITADEL)?.connect(&user);
  let vester = ctx.require(X_CITADEL_VESTER)?;
  let locker = ctx.require(X_CITADEL_LOCKER)?;
  let citadel = ctx.require(CITADEL)?;
  let minter = ctx.require(CITADEL_MINTER)?.connect(policy_ops);
  let user_address: Address = user.address;

  x_citadel.call("withdraw", vec![parse_units(50, 18)?.into()]).await?;

  info!("fast forward to 10 days later to have some vested CTDL unlocked");
  state.backend.increase_time(10 * DAY).await?;
  vester
    .call("claim", vec![user_address.into(), parse_units(20, 18)?.into()])
    .await?;
  let claimed = citadel.view_uint("balanceOf", vec![user_address.into()]).await?;
  info!("got {} CTDL 10 days later", format_units(claimed, 18));

  x_citadel
    .call("approve", vec![locker.address().into(), parse_units(150, 18)?.into()])
    .await?;

  let locks = [parse_units(50, 18)?, parse_units(100, 18)?];
  let as_user = locker.connect(&user);

  info!("locking up 50 xCTDL");
  as_user
    .call("lock", vec![user_address.into(), locks[0].into(), 0u64.into()])
    .await?;

  info!("fast forward to 22 weeks later to make the position unlockable");
  state.backend.increase_time(22 * WEEK).await?;
  locker.call("checkpointEpoch", vec![]).await?;
  minter.call("mintAndDistribute", vec![]).await?;

  info!("lock another 100 xCTDL to make the position locked");
  as_user
    .call("lock", vec![user_address.into(), locks[1].into(), 0u64.into()])
    .await?;

  state.backend.increase_time(5 * WEEK).await?;
  locker.call("checkpointEpoch", vec![]).await?;

  let locked = locks.iter().fold(U256::ZERO, |total, amount| total.saturating_add(*amount));
  let vesting_end = state.backend.block_timestamp().await?;
  info!("total locked position: {}", format_units(locked, 18));
  Ok(
    Context::new()
      .with(LOCKED_X_CITADEL, locked)
      .with(VESTING_END, vesting_end),
  )
}

#[instrument(name = "journey::set_mock_funding_price", skip_all, err)]
pub async fn set_mock_funding_price(_state: AppState, ctx: Context) -> AppResult<Context> {
  let governance = &ctx.require(SIGNERS)?.governance;
  let funding = ctx.require(FUNDING_WBTC)?;

  funding
    .connect(governance)
    .call(
      "setCitadelAssetPriceBounds",
      vec![WBTC_PRICE_BOUNDS.0.into(), WBTC_PRICE_BOUNDS.1.into()],
    )
    .await?;
  funding
    .call("updateCitadelPriceInAsset", vec![WBTC_CITADEL_PRICE.into()])
    .await?;

  info!(
    min = WBTC_PRICE_BOUNDS.0,
    max = WBTC_PRICE_BOUNDS.1,
    price = WBTC_CITADEL_PRICE,
    "wBTC funding price set."
  );
  Ok(Context::new())
}
