// citadel_deploy/src/main.rs

mod config;
mod errors;
mod models;
mod pipelines;
mod runner;
mod state;

use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use crate::models::deployment::{MintRequest, MintableToken};
use crate::pipelines::contexts::{CONFIG_PATH, KNIGHTING_ROUNDS, LOCKED_X_CITADEL, MINTED_BALANCE};
use crate::state::AppState;

use alloy_primitives::{Address, U256};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use stepwise::pricing::format_units;
use stepwise::Context;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "citadel-deploy", about = "Runs Citadel deployment scenarios against an in-memory chain")]
struct Cli {
  /// Network name used for the stored record's file name.
  #[arg(long, env = "NETWORK_NAME")]
  network: Option<String>,

  /// Directory the deployment record is written to.
  #[arg(long, env = "SCRIPTS_DATA_DIR")]
  scripts_data_dir: Option<PathBuf>,

  /// Target CTDL price in whole dollars.
  #[arg(long, env = "DESIRED_PRICE_USD")]
  desired_price: Option<u64>,

  /// Quote token prices from the built-in table.
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Deploy, initialize and wire the core contracts with mock tokens.
  DeployMock,
  /// The mock deployment plus funding pools, oracles and the emission schedule.
  DeployFunding,
  /// The funding deployment, then a user bonding, vesting and locking xCTDL.
  UserJourney,
  /// Deploy a guest list and one knighting round per accepted token.
  KnightingRounds {
    #[arg(long, value_parser = parse_address)]
    citadel: Option<Address>,
    #[arg(long, value_parser = parse_address)]
    multisig: Option<Address>,
  },
  /// Mint a mock token to an address.
  Mint {
    #[arg(long, value_enum)]
    token: MintableToken,
    #[arg(long, value_parser = parse_address)]
    address: Address,
    /// Amount in the token's smallest unit.
    #[arg(long)]
    amount: u128,
  },
  /// Print the signing accounts of the chain.
  Accounts,
  /// List the registered scenarios and their steps.
  List,
}

fn parse_address(raw: &str) -> Result<Address, String> {
  raw.parse::<Address>().map_err(|e| format!("invalid address '{}': {}", raw, e))
}

fn load_config(cli: &Cli) -> AppResult<AppConfig> {
  let mut config = AppConfig::from_env()?;
  if let Some(network) = &cli.network {
    config.network_name = network.clone();
  }
  if let Some(dir) = &cli.scripts_data_dir {
    config.scripts_data_dir = dir.clone();
  }
  if let Some(price) = cli.desired_price {
    if price == 0 {
      return Err(AppError::Validation("--desired-price must be greater than zero".to_string()));
    }
    config.desired_price_usd = price;
  }
  config.offline_prices |= cli.offline;
  Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
  let rendered = serde_json::to_string_pretty(value).map_err(|e| AppError::Internal(e.to_string()))?;
  println!("{}", rendered);
  Ok(())
}

fn log_record_path(ctx: &Context) {
  if let Some(path) = ctx.get(CONFIG_PATH) {
    tracing::info!(path = %path.display(), "Deployment record written.");
  }
}

async fn run(cli: Cli) -> AppResult<()> {
  let config = load_config(&cli)?;
  let (app_state, chain) = AppState::with_mock_chain(config);
  pipelines::register_all_pipelines(&app_state);

  match cli.command {
    Command::DeployMock => {
      let ctx = runner::deploy_mock(&app_state).await?;
      log_record_path(&ctx);
    }
    Command::DeployFunding => {
      let ctx = runner::deploy_funding(&app_state).await?;
      log_record_path(&ctx);
    }
    Command::UserJourney => {
      let ctx = runner::user_journey(&app_state).await?;
      if let Some(locked) = ctx.get(LOCKED_X_CITADEL) {
        tracing::info!(locked = %format_units(*locked, 18), "User journey complete.");
      }
      log_record_path(&ctx);
    }
    Command::KnightingRounds { citadel, multisig } => {
      let ctx = runner::knighting_rounds(&app_state, citadel, multisig).await?;
      if let Some(rounds) = ctx.get(KNIGHTING_ROUNDS) {
        print_json(rounds)?;
      }
    }
    Command::Mint { token, address, amount } => {
      let request = MintRequest {
        token,
        to: address,
        amount: U256::from(amount),
      };
      runner::install_recorded_token(&app_state, &chain, &request)?;
      let ctx = runner::mint(&app_state, request).await?;
      if let Some(balance) = ctx.get(MINTED_BALANCE) {
        tracing::info!(%balance, "Mint complete.");
      }
    }
    Command::Accounts => {
      for account in runner::accounts(&app_state).await? {
        println!("{}", account);
      }
    }
    Command::List => {
      let scenarios: BTreeMap<String, Vec<String>> = app_state
        .registry
        .names()
        .into_iter()
        .filter_map(|name| app_state.registry.describe(&name).map(|steps| (name, steps)))
        .collect();
      print_json(&scenarios)?;
    }
  }
  Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  let cli = Cli::parse();
  tracing::info!(command = ?cli.command, "Starting citadel-deploy...");

  match run(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!(error = %e, "Scenario failed.");
      ExitCode::from(1)
    }
  }
}
