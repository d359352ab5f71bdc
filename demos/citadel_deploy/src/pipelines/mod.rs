// citadel_deploy/src/pipelines/mod.rs

//! Defines and registers every deployment scenario.

use crate::state::AppState;

pub mod common_steps;
pub mod contexts;

pub mod deploy_mock_pipeline;
pub mod funding_pipeline;
pub mod knighting_round_pipeline;
pub mod mint_pipeline;
pub mod user_journey_pipeline;

/// Registers all scenarios in the registry carried by `app_state`.
pub fn register_all_pipelines(app_state: &AppState) {
  tracing::info!("Registering deployment scenarios...");

  deploy_mock_pipeline::register_deploy_mock_pipeline(app_state);
  funding_pipeline::register_funding_pipeline(app_state);
  knighting_round_pipeline::register_knighting_round_pipeline(app_state);
  mint_pipeline::register_mint_pipeline(app_state);
  user_journey_pipeline::register_user_journey_pipeline(app_state);

  tracing::info!(scenarios = ?app_state.registry.names(), "All deployment scenarios registered.");
}
