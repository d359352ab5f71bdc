// citadel_deploy/src/pipelines/common_steps.rs
use crate::errors::{AppError, Result as AppResult};
use crate::models::roles::RoleSigners;
use crate::models::token_in::CATALOG;
use crate::pipelines::contexts::{SIGNERS, TOKEN_INS};
use crate::state::AppState;
use alloy_primitives::Address;
use stepwise::{Context, Contract, Key, StepDecl};
use tracing::{info, instrument};

/// Adapts a step function taking the app state into a pipeline handler.
pub fn bind<F, Fut>(state: &AppState, step: F) -> impl Fn(Context) -> Fut + Send + Sync + 'static
where
  F: Fn(AppState, Context) -> Fut + Send + Sync + 'static,
{
  let state = state.clone();
  move |ctx| step(state.clone(), ctx)
}

/// Observer logging a progress line once the steps before it have run.
pub fn log_progress(message: &'static str) -> impl Fn(&Context) + Send + Sync + 'static {
  move |ctx| info!(keys = ctx.len(), "{}", message)
}

/// Address of a deployed contract, or the zero address when absent.
pub fn address_of(ctx: &Context, key: Key<Contract>) -> Address {
  ctx.get(key).map(Contract::address).unwrap_or(Address::ZERO)
}

/// `timestamp + seconds`, refusing to wrap past the end of the clock.
pub fn timestamp_after(timestamp: u64, seconds: u64) -> AppResult<u64> {
  timestamp
    .checked_add(seconds)
    .ok_or_else(|| AppError::Validation(format!("timestamp {} + {}s overflows the block clock", timestamp, seconds)))
}

pub const GET_ROLE_SIGNERS: &str = "get_role_signers";

pub fn get_role_signers_decl() -> StepDecl {
  StepDecl::new(GET_ROLE_SIGNERS).produces(&[SIGNERS.name()])
}

#[instrument(name = "common_step::get_role_signers", skip_all, err)]
pub async fn get_role_signers(state: AppState, _ctx: Context) -> AppResult<Context> {
  let accounts = state.backend.accounts().await?;
  let signers = RoleSigners::from_accounts(&accounts)?;
  info!(governance = %signers.governance, policy_ops = %signers.policy_ops, "Role signers resolved.");
  Ok(Context::new().with(SIGNERS, signers))
}

pub const TOKEN_INS_STEP: &str = "token_ins";

pub fn token_ins_decl() -> StepDecl {
  StepDecl::new(TOKEN_INS_STEP).produces(&[TOKEN_INS.name()])
}

/// Resolves the accepted input tokens. A token with a local mock deployment
/// in the context is paid with that deployment's address.
#[instrument(name = "common_step::token_ins", skip_all, err)]
pub async fn token_ins(_state: AppState, ctx: Context) -> AppResult<Context> {
  let tokens: Vec<_> = CATALOG
    .iter()
    .map(|entry| {
      let local = entry
        .local_instance
        .and_then(|name| ctx.get_named::<Contract>(name))
        .map(Contract::address);
      entry.resolve(local)
    })
    .collect();
  info!(count = tokens.len(), "Token-ins resolved.");
  Ok(Context::new().with(TOKEN_INS, tokens))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamp_after_rejects_overflow() {
    assert_eq!(timestamp_after(1_000, 180).unwrap(), 1_180);
    assert!(matches!(timestamp_after(u64::MAX, 1), Err(AppError::Validation(_))));
  }
}
