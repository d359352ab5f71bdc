// citadel_deploy/src/pipelines/deploy_mock_pipeline.rs

//! `deploy-mock`: deploys the Citadel core contracts plus mock tokens,
//! initializes and wires them, grants roles and stores the address record.

use crate::errors::{AppError, Result as AppResult};
use crate::models::roles::{self, role_id};
use crate::pipelines::common_steps::{self, address_of, bind, log_progress};
use crate::pipelines::contexts::*;
use crate::state::AppState;
use alloy_primitives::{Address, U256};
use stepwise::pricing::parse_units;
use stepwise::record::{self, DeploymentRecord};
use stepwise::{map_sequentially, run_sequentially, Context, Contract, ContractFactory, Key, Pipeline, StepDecl, Token};
use tracing::{event, info, instrument, Level};

pub const SCENARIO: &str = "deploy-mock";

pub const SETUP_AND_DEPLOY: &str = "setup_and_deploy";
pub const MOCK_MINT: &str = "mock_mint";
pub const INITIALIZER: &str = "initializer";
pub const GRANT_ROLES: &str = "grant_roles";
pub const STORE_CONFIG: &str = "store_config";

/// Core contracts, deployed in this order.
pub const CORE_DEPLOYMENTS: [(Key<Contract>, &str); 10] = [
  (GAC, "GlobalAccessControl"),
  (CITADEL, "CitadelToken"),
  (X_CITADEL, "StakedCitadel"),
  (X_CITADEL_VESTER, "StakedCitadelVester"),
  (X_CITADEL_LOCKER, "StakedCitadelLocker"),
  (SCHEDULE, "SupplySchedule"),
  (CITADEL_MINTER, "CitadelMinter"),
  (KNIGHTING_ROUND, "KnightingRound"),
  (FUNDING_WBTC, "Funding"),
  (FUNDING_CVX, "Funding"),
];

/// Mock tokens and the amount minted of each.
const MOCK_TOKENS: [(Key<Contract>, &str, u64); 3] = [
  (WBTC, "WrapBitcoin", 100_000_000),
  (CVX, "Convex", 1_000_000_000_000_000_000),
  (USDC, "USDC", 100_000_000_000),
];

/// Contracts written to the stored record, under their context key names.
pub const RECORDED_CONTRACTS: [Key<Contract>; 10] = [
  GAC,
  CITADEL,
  X_CITADEL,
  X_CITADEL_VESTER,
  X_CITADEL_LOCKER,
  SCHEDULE,
  CITADEL_MINTER,
  KNIGHTING_ROUND,
  WBTC,
  CVX,
];

fn contract_names(keys: &[Key<Contract>]) -> Vec<&'static str> {
  keys.iter().map(Key::name).collect()
}

pub fn step_decls() -> Vec<StepDecl> {
  let core_names = contract_names(&CORE_DEPLOYMENTS.map(|(key, _)| key));
  let mock_names = contract_names(&MOCK_TOKENS.map(|(key, _, _)| key));
  vec![
    StepDecl::new(SETUP_AND_DEPLOY).produces(&core_names),
    StepDecl::new("log_deployed"),
    StepDecl::new(MOCK_MINT).reads(&[MINT_TO.name()]).produces(&mock_names),
    StepDecl::new("log_minted"),
    common_steps::get_role_signers_decl(),
    StepDecl::new("log_roles_assigned"),
    StepDecl::new(INITIALIZER).reads(&[SIGNERS.name(), X_CITADEL_FEES.name()]),
    StepDecl::new("log_initialized"),
    StepDecl::new(GRANT_ROLES)
      .reads(&[SIGNERS.name(), GAC.name()])
      .produces(&[ROLES_GRANTED.name()]),
    StepDecl::new("log_roles_granted"),
    StepDecl::new(STORE_CONFIG)
      .reads(&[BASE_PATH.name(), CONFIG_FILE.name()])
      .produces(&[CONFIG_PATH.name()]),
    StepDecl::new("log_config_stored"),
  ]
}

/// Attaches every deploy-mock handler to `pipeline`, which must declare the
/// steps from [`step_decls`].
pub fn attach_handlers(pipeline: &mut Pipeline<AppError>, app_state: &AppState) {
  pipeline.on(SETUP_AND_DEPLOY, bind(app_state, setup_and_deploy));
  pipeline.observe("log_deployed", log_progress("Contracts deployed ..."));
  pipeline.on(MOCK_MINT, bind(app_state, mock_mint));
  pipeline.observe("log_minted", log_progress("Mock tokens minted ..."));
  pipeline.on(common_steps::GET_ROLE_SIGNERS, bind(app_state, common_steps::get_role_signers));
  pipeline.observe("log_roles_assigned", log_progress("Roles assigned ..."));
  pipeline.on(INITIALIZER, bind(app_state, initializer));
  pipeline.observe("log_initialized", log_progress("Contracts initialized ..."));
  pipeline.on(GRANT_ROLES, bind(app_state, grant_roles));
  pipeline.observe("log_roles_granted", log_progress("Roles granted ..."));
  pipeline.on(STORE_CONFIG, bind(app_state, store_config));
  pipeline.observe("log_config_stored", log_progress("Config stored ..."));
}

pub fn build_pipeline(app_state: &AppState) -> Pipeline<AppError> {
  let mut pipeline = Pipeline::<AppError>::new(&step_decls());
  attach_handlers(&mut pipeline, app_state);
  pipeline
}

/// Registers the mock deployment scenario.
pub fn register_deploy_mock_pipeline(app_state: &AppState) {
  app_state.registry.register_pipeline(SCENARIO, build_pipeline(app_state));
}

/// Deploys `(key, artifact)` pairs one after another, logging each address.
pub async fn deploy_contracts(
  factory_of: impl Fn(&str) -> ContractFactory,
  deployments: &[(Key<Contract>, &str)],
) -> AppResult<Context> {
  let deployed = map_sequentially(deployments.iter(), |(key, artifact)| {
    let factory = factory_of(artifact);
    let key = *key;
    async move {
      let contract = factory.deploy(vec![]).await?;
      info!("{} address is: {}", key.name(), contract.address());
      Ok::<_, AppError>((key, contract))
    }
  })
  .await?;

  Ok(
    deployed
      .into_iter()
      .fold(Context::new(), |ctx, (key, contract)| ctx.with(key, contract)),
  )
}

#[instrument(name = "deploy_mock::setup_and_deploy", skip_all, err)]
pub async fn setup_and_deploy(state: AppState, _ctx: Context) -> AppResult<Context> {
  let backend = state.backend.clone();
  deploy_contracts(|artifact| ContractFactory::new(backend.clone(), artifact), &CORE_DEPLOYMENTS).await
}

#[instrument(name = "deploy_mock::mock_mint", skip_all, err)]
pub async fn mock_mint(state: AppState, ctx: Context) -> AppResult<Context> {
  let mint_to = *ctx.require(MINT_TO)?;
  let backend = state.backend.clone();
  let deployments = MOCK_TOKENS.map(|(key, artifact, _)| (key, artifact));
  let tokens = deploy_contracts(|artifact| ContractFactory::new(backend.clone(), artifact), &deployments).await?;

  run_sequentially(MOCK_TOKENS.iter(), |(key, _, amount)| {
    let token = tokens.require(*key).cloned();
    let amount = U256::from(*amount);
    async move {
      token?.call("mint", vec![mint_to.into(), amount.into()]).await?;
      Ok::<_, AppError>(())
    }
  })
  .await?;

  event!(Level::INFO, %mint_to, "Mock tokens minted.");
  Ok(tokens)
}

/// Initializes every deployed contract present in the context. Missing
/// contracts are skipped, and missing references are passed as the zero
/// address.
#[instrument(name = "deploy_mock::initializer", skip_all, err)]
pub async fn initializer(_state: AppState, ctx: Context) -> AppResult<Context> {
  let signers = ctx.require(SIGNERS)?;
  let fees = *ctx.require(X_CITADEL_FEES)?;
  let governance = &signers.governance;
  let addr = |key: Key<Contract>| Token::Address(address_of(&ctx, key));

  if let Some(gac) = ctx.get(GAC) {
    gac.connect(governance).call("initialize", vec![governance.address.into()]).await?;
  }
  if let Some(citadel) = ctx.get(CITADEL) {
    citadel
      .connect(governance)
      .call("initialize", vec!["Citadel".into(), "CTDL".into(), addr(GAC)])
      .await?;
  }
  if let Some(x_citadel) = ctx.get(X_CITADEL) {
    x_citadel
      .connect(governance)
      .call(
        "initialize",
        vec![
          addr(CITADEL),
          governance.address.into(),
          signers.keeper.address.into(),
          signers.guardian.address.into(),
          signers.treasury_vault.address.into(),
          signers.tech_ops.address.into(),
          signers.citadel_tree.address.into(),
          addr(X_CITADEL_VESTER),
          "Staked Citadel".into(),
          "xCTDL".into(),
          fees.to_vec().into(),
        ],
      )
      .await?;
  }
  if let Some(vester) = ctx.get(X_CITADEL_VESTER) {
    vester
      .connect(governance)
      .call("initialize", vec![addr(GAC), addr(CITADEL), addr(X_CITADEL)])
      .await?;
  }
  if let Some(locker) = ctx.get(X_CITADEL_LOCKER) {
    let locker = locker.connect(governance);
    locker
      .call(
        "initialize",
        vec![addr(X_CITADEL), addr(GAC), "Vote Locked xCitadel".into(), "vlCTDL".into()],
      )
      .await?;
    locker
      .call("addReward", vec![addr(X_CITADEL), addr(CITADEL_MINTER), true.into()])
      .await?;
  }
  if let Some(schedule) = ctx.get(SCHEDULE) {
    schedule.connect(governance).call("initialize", vec![addr(GAC)]).await?;
  }
  if let Some(minter) = ctx.get(CITADEL_MINTER) {
    minter
      .connect(governance)
      .call(
        "initialize",
        vec![addr(GAC), addr(CITADEL), addr(X_CITADEL), addr(X_CITADEL_LOCKER), addr(SCHEDULE)],
      )
      .await?;
  }

  // Funding pools are initialized from the default sender.
  let pools = [(FUNDING_WBTC, WBTC, 100u64, 8u8), (FUNDING_CVX, CVX, 100_000, 18)];
  for (funding_key, asset_key, cap, decimals) in pools {
    if let Some(funding) = ctx.get(funding_key) {
      funding
        .call(
          "initialize",
          vec![
            addr(GAC),
            addr(CITADEL),
            addr(asset_key),
            addr(X_CITADEL),
            signers.treasury_vault.address.into(),
            signers.eoa_oracle.address.into(),
            parse_units(cap, decimals)?.into(),
          ],
        )
        .await?;
    }
  }

  info!("Deployed contracts initialized.");
  Ok(Context::new())
}

#[instrument(name = "deploy_mock::grant_roles", skip_all, err)]
pub async fn grant_roles(_state: AppState, ctx: Context) -> AppResult<Context> {
  let signers = ctx.require(SIGNERS)?;
  let gac = ctx.require(GAC)?.connect(&signers.governance);

  let grants: Vec<(&str, Address)> = vec![
    (roles::CONTRACT_GOVERNANCE_ROLE, signers.governance.address),
    (roles::TREASURY_GOVERNANCE_ROLE, signers.treasury_vault.address),
    (roles::TECH_OPERATIONS_ROLE, signers.tech_ops.address),
    (roles::TREASURY_OPERATIONS_ROLE, signers.treasury_ops.address),
    (roles::POLICY_OPERATIONS_ROLE, signers.policy_ops.address),
    (roles::CITADEL_MINTER_ROLE, address_of(&ctx, CITADEL_MINTER)),
    (roles::CITADEL_MINTER_ROLE, signers.governance.address),
    (roles::PAUSER_ROLE, signers.governance.address),
    (roles::UNPAUSER_ROLE, signers.tech_ops.address),
  ];

  let granted = run_sequentially(grants, |(role, account)| {
    let gac = gac.clone();
    async move {
      gac.call("grantRole", vec![role_id(role).into(), account.into()]).await?;
      event!(Level::DEBUG, %role, %account, "Role granted.");
      Ok::<_, AppError>(())
    }
  })
  .await?;

  Ok(Context::new().with(ROLES_GRANTED, granted))
}

/// Builds the address record of the recorded contracts. Contracts missing from
/// the context are written as the zero address.
pub fn deployment_record(ctx: &Context) -> DeploymentRecord {
  RECORDED_CONTRACTS
    .iter()
    .fold(DeploymentRecord::new(), |record, key| record.with(key.name(), address_of(ctx, *key)))
}

#[instrument(name = "deploy_mock::store_config", skip_all, err)]
pub async fn store_config(_state: AppState, ctx: Context) -> AppResult<Context> {
  let base_path = ctx.require(BASE_PATH)?;
  let config_file = ctx.require(CONFIG_FILE)?;
  let path = record::store(base_path, config_file, &deployment_record(&ctx))?;
  Ok(Context::new().with(CONFIG_PATH, path))
}
