// citadel_deploy/src/pipelines/knighting_round_pipeline.rs

//! `knighting-rounds`: a guest-listed sale of CTDL per accepted token, in two
//! phases. Each round's exchange rate is derived from the token's live USD
//! price and the desired CTDL price.

use crate::errors::{AppError, Result as AppResult};
use crate::models::deployment::KnightingRoundDeployment;
use crate::models::roles::{role_id, TECH_OPERATIONS_ROLE};
use crate::models::token_in::{RoundPhase, TokenIn};
use crate::pipelines::common_steps::{self, bind, timestamp_after};
use crate::pipelines::contexts::*;
use crate::state::AppState;
use alloy_primitives::{b256, Address, B256, U256};
use std::collections::HashMap;
use stepwise::price_feed::fetch_quotes;
use stepwise::pricing::{token_amount_for_usd, token_out_per_token_in};
use stepwise::{map_sequentially, Context, ContractFactory, ExchangeRate, Pipeline, PriceQuote, StepDecl, UsdPrice};
use tracing::{event, info, instrument, Level};

pub const SCENARIO: &str = "knighting-rounds";

pub const DEPLOY_ACCESS_CONTROL: &str = "deploy_access_control";
pub const KNIGHTING_ROUNDS_STEP: &str = "knighting_rounds";

pub const GUEST_LIST_ROOT: B256 = b256!("7e5eaba80a7bd7636e9edd5c7a84daa71b476e698bb85f06202152751fb9b5f8");

/// Keeps phase one's start out of the past by the time rounds are initialized.
pub const START_DELAY: u64 = 180;
pub const PHASE_ONE_DURATION: u64 = 3 * 24 * 3600;
pub const PHASE_TWO_DURATION: u64 = 2 * 24 * 3600;
/// Phase-two cap per round, in whole dollars of input token.
pub const PHASE_TWO_USD_LIMIT: u64 = 1_000_000;

pub fn build_pipeline(app_state: &AppState) -> Pipeline<AppError> {
  let mut pipeline = Pipeline::<AppError>::new(&[
    common_steps::get_role_signers_decl(),
    StepDecl::new(DEPLOY_ACCESS_CONTROL)
      .reads(&[SIGNERS.name()])
      .produces(&[GAC.name()]),
    common_steps::token_ins_decl(),
    StepDecl::new(KNIGHTING_ROUNDS_STEP)
      .reads(&[
        GAC.name(),
        SIGNERS.name(),
        TOKEN_INS.name(),
        DESIRED_PRICE.name(),
        CITADEL_ADDRESS.name(),
        MULTISIG.name(),
      ])
      .produces(&[GUEST_LIST.name(), KNIGHTING_ROUNDS.name()]),
  ]);

  pipeline.on(common_steps::GET_ROLE_SIGNERS, bind(app_state, common_steps::get_role_signers));
  pipeline.on(DEPLOY_ACCESS_CONTROL, bind(app_state, deploy_access_control));
  pipeline.on(common_steps::TOKEN_INS_STEP, bind(app_state, common_steps::token_ins));
  pipeline.on(KNIGHTING_ROUNDS_STEP, bind(app_state, knighting_rounds));
  pipeline
}

pub fn register_knighting_round_pipeline(app_state: &AppState) {
  app_state.registry.register_pipeline(SCENARIO, build_pipeline(app_state));
}

#[instrument(name = "knighting::deploy_access_control", skip_all, err)]
pub async fn deploy_access_control(state: AppState, ctx: Context) -> AppResult<Context> {
  let signers = ctx.require(SIGNERS)?;
  let gac = ContractFactory::new(state.backend.clone(), "GlobalAccessControl")
    .deploy(vec![])
    .await?;
  let as_governance = gac.connect(&signers.governance);
  as_governance
    .call("initialize", vec![signers.governance.address.into()])
    .await?;
  as_governance
    .call(
      "grantRole",
      vec![role_id(TECH_OPERATIONS_ROLE).into(), signers.tech_ops.address.into()],
    )
    .await?;
  info!("gac address is: {}", gac.address());
  Ok(Context::new().with(GAC, gac))
}

/// Terms of one round, before deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPlan {
  pub token: TokenIn,
  pub token_out_per_token_in: ExchangeRate,
  pub start: u64,
  pub duration: u64,
  pub token_in_limit: U256,
}

/// Prices every token-in against `desired` and lays the rounds out: phase one
/// uncapped from `phase_one_start`, phase two capped in USD right after it.
pub fn plan_rounds(
  tokens: &[TokenIn],
  quotes: &HashMap<Address, PriceQuote>,
  desired: UsdPrice,
  phase_one_start: u64,
) -> AppResult<Vec<RoundPlan>> {
  let phase_two_start = timestamp_after(phase_one_start, PHASE_ONE_DURATION)?;
  tokens
    .iter()
    .map(|token| {
      let quote = quotes
        .get(&token.price_address)
        .ok_or_else(|| AppError::Internal(format!("no quote fetched for {}", token.name)))?;
      let price = quote.usd_price()?;
      let rate = token_out_per_token_in(desired, price, token.decimals)?;
      let (start, duration, limit) = match token.phase {
        RoundPhase::One => (phase_one_start, PHASE_ONE_DURATION, U256::MAX),
        RoundPhase::Two => (
          phase_two_start,
          PHASE_TWO_DURATION,
          token_amount_for_usd(PHASE_TWO_USD_LIMIT, price, token.decimals)?,
        ),
      };
      Ok(RoundPlan {
        token: token.clone(),
        token_out_per_token_in: rate,
        start,
        duration,
        token_in_limit: limit,
      })
    })
    .collect()
}

#[instrument(name = "knighting::knighting_rounds", skip_all, err)]
pub async fn knighting_rounds(state: AppState, ctx: Context) -> AppResult<Context> {
  let signers = ctx.require(SIGNERS)?;
  let gac = ctx.require(GAC)?.address();
  let tokens = ctx.require(TOKEN_INS)?;
  let desired = *ctx.require(DESIRED_PRICE)?;
  let citadel = *ctx.require(CITADEL_ADDRESS)?;
  let multisig = *ctx.require(MULTISIG)?;

  let guest_list = ContractFactory::new(state.backend.clone(), "KnightingRoundGuestlist")
    .deploy(vec![])
    .await?;
  guest_list.call("initialize", vec![gac.into()]).await?;
  guest_list
    .connect(&signers.tech_ops)
    .call("setGuestRoot", vec![GUEST_LIST_ROOT.into()])
    .await?;

  let wanted: Vec<(Address, u8)> = tokens.iter().map(|t| (t.price_address, t.decimals)).collect();
  let quotes: HashMap<Address, PriceQuote> = fetch_quotes(state.price_feed.as_ref(), &wanted)
    .await?
    .into_iter()
    .map(|quote| (quote.token, quote))
    .collect();

  let phase_one_start = timestamp_after(state.backend.block_timestamp().await?, START_DELAY)?;
  let plans = plan_rounds(tokens, &quotes, desired, phase_one_start)?;

  let round_factory = ContractFactory::new(state.backend.clone(), "KnightingRound");
  let guest_list_address = guest_list.address();
  let rounds = map_sequentially(plans, |plan| {
    let round_factory = round_factory.clone();
    async move {
      let round = round_factory.deploy(vec![]).await?;
      info!("{} knighting round address: {}", plan.token.name, round.address());
      round
        .call(
          "initialize",
          vec![
            gac.into(),
            citadel.into(),
            plan.token.address.into(),
            plan.start.into(),
            plan.duration.into(),
            <U256 as From<ExchangeRate>>::from(plan.token_out_per_token_in).into(),
            multisig.into(),
            guest_list_address.into(),
            plan.token_in_limit.into(),
          ],
        )
        .await?;
      Ok::<_, AppError>(KnightingRoundDeployment {
        token: plan.token.name,
        phase: plan.token.phase,
        address: round.address(),
        token_out_per_token_in: plan.token_out_per_token_in,
        start: plan.start,
        duration: plan.duration,
        token_in_limit: plan.token_in_limit,
      })
    }
  })
  .await?;

  event!(Level::INFO, rounds = rounds.len(), "Knighting rounds deployed.");
  Ok(
    Context::new()
      .with(GUEST_LIST, guest_list)
      .with(KNIGHTING_ROUNDS, rounds),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::token_in::CATALOG;

  fn quotes_for(tokens: &[TokenIn]) -> HashMap<Address, PriceQuote> {
    tokens
      .iter()
      .map(|t| {
        let entry = CATALOG.iter().find(|e| e.name == t.name).unwrap();
        (
          t.price_address,
          PriceQuote {
            token: t.price_address,
            decimals: t.decimals,
            usd: entry.offline_usd,
          },
        )
      })
      .collect()
  }

  #[test]
  fn phases_get_their_own_window_and_cap() {
    let tokens: Vec<TokenIn> = CATALOG.iter().map(|e| e.resolve(None)).collect();
    let plans = plan_rounds(&tokens, &quotes_for(&tokens), UsdPrice::from_dollars(21), 1_000).unwrap();

    let wbtc = &plans[0];
    assert_eq!(wbtc.start, 1_000);
    assert_eq!(wbtc.duration, PHASE_ONE_DURATION);
    assert_eq!(wbtc.token_in_limit, U256::MAX);
    // 21 / 40000 CTDL-wei per satoshi, at 18 extra decimals.
    assert_eq!(
      wbtc.token_out_per_token_in.raw(),
      "52500000000000000000000".parse::<U256>().unwrap()
    );

    let cvx = plans.iter().find(|p| p.token.name == "CVX").unwrap();
    assert_eq!(cvx.start, 1_000 + PHASE_ONE_DURATION);
    assert_eq!(cvx.duration, PHASE_TWO_DURATION);
    // $1,000,000 of CVX at $20.
    assert_eq!(cvx.token_in_limit, U256::from(50_000u64) * U256::from(10u64).pow(U256::from(18u64)));
  }

  #[test]
  fn missing_quote_fails_planning() {
    let tokens: Vec<TokenIn> = CATALOG.iter().map(|e| e.resolve(None)).collect();
    let mut quotes = quotes_for(&tokens);
    quotes.remove(&tokens[3].price_address);
    assert!(matches!(
      plan_rounds(&tokens, &quotes, UsdPrice::from_dollars(21), 0),
      Err(AppError::Internal(_))
    ));
  }

  #[test]
  fn start_near_the_end_of_time_is_rejected() {
    let tokens: Vec<TokenIn> = CATALOG.iter().map(|e| e.resolve(None)).collect();
    let result = plan_rounds(&tokens, &quotes_for(&tokens), UsdPrice::from_dollars(21), u64::MAX - 10);
    assert!(matches!(result, Err(AppError::Validation(_))));
  }
}
