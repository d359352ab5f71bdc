// tests/registry_tests.rs
mod common;

use common::*;
use serial_test::serial;
use stepwise::{Context, Pipeline, Registry, StepwiseError};

// Application-level error that wraps both test handler errors and framework errors.
#[derive(Debug, thiserror::Error)]
enum AppError {
  #[error("scenario failed: {0}")]
  Scenario(#[from] TestError),

  #[error("framework: {0}")]
  Framework(#[from] StepwiseError),
}

fn counting_pipeline(steps: &[&'static str]) -> Pipeline<TestError> {
  let mut pipeline = Pipeline::<TestError>::from_names(steps);
  for &step in steps {
    pipeline.on(step, create_simple_handler(step, ""));
  }
  pipeline
}

#[tokio::test]
#[serial]
async fn test_registry_runs_pipeline_by_name() {
  setup_tracing();
  let registry = Registry::<AppError>::new();
  registry.register_pipeline("deploy", counting_pipeline(&["deploy_a", "deploy_b"]));
  registry.register_pipeline("mint", counting_pipeline(&["mint"]));

  let ctx = registry.run("deploy", Context::new()).await.unwrap();
  assert_eq!(trace_of(&ctx), vec!["deploy_a", "deploy_b"]);

  assert_eq!(registry.names(), vec!["deploy", "mint"]);
  assert_eq!(registry.describe("mint"), Some(vec!["mint".to_string()]));
  assert!(registry.describe("unknown").is_none());
}

#[tokio::test]
#[serial]
async fn test_unknown_scenario_is_a_configuration_error() {
  setup_tracing();
  let registry = Registry::<AppError>::new();

  match registry.run("missing", Context::new()).await {
    Err(AppError::Framework(StepwiseError::ConfigurationError { message, .. })) => {
      assert!(message.contains("missing"));
    }
    other => panic!("expected ConfigurationError, got {:?}", other.map(|c| c.len())),
  }
}

#[tokio::test]
#[serial]
async fn test_handler_errors_are_mapped_into_application_error() {
  setup_tracing();
  let registry = Registry::<AppError>::new();
  let mut pipeline = Pipeline::<TestError>::from_names(&["explode"]);
  pipeline.on("explode", create_failing_handler("explode", "boom"));
  registry.register_pipeline("explode", pipeline);

  let err = registry.run("explode", Context::new()).await.unwrap_err();
  assert!(matches!(err, AppError::Scenario(TestError::Handler(ref m)) if m == "boom"));
}

#[tokio::test]
#[serial]
async fn test_default_registry_uses_stepwise_error() {
  setup_tracing();
  let registry: Registry = Registry::default();
  let mut pipeline = Pipeline::<StepwiseError>::from_names(&["only"]);
  pipeline.on("only", |_ctx: Context| async move { Ok::<(), StepwiseError>(()) });
  registry.register_pipeline("only", pipeline);

  assert!(registry.contains("only"));
  assert!(registry.run("only", Context::new()).await.is_ok());
}
