// tests/error_handling_tests.rs
mod common;
use common::*;
use serial_test::serial;
use stepwise::{Context, Key, Pipeline, StepwiseError};

#[tokio::test]
#[serial]
async fn test_pipeline_run_catches_handler_missing() {
  setup_tracing();
  let pipeline = Pipeline::<TestError>::from_names(&["missing"]);
  let result = pipeline.run(Context::new()).await;
  match result.unwrap_err() {
    TestError::Stepwise(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("missing"));
    }
    other => panic!("Expected TestError::Stepwise(HandlerMissing), got {:?}", other),
  }
}

// A pipeline whose error type IS StepwiseError, with handlers using anyhow.
#[tokio::test]
#[serial]
async fn test_anyhow_errors_become_handler_errors() {
  setup_tracing();
  let mut pipeline = Pipeline::<StepwiseError>::from_names(&["external_call"]);
  pipeline.on("external_call", |_ctx: Context| async move {
    let result: anyhow::Result<()> = Err(anyhow::anyhow!("rpc timed out"));
    result.map_err(StepwiseError::from)
  });

  match pipeline.run(Context::new()).await {
    Err(StepwiseError::HandlerError { source }) => assert_eq!(source.to_string(), "rpc timed out"),
    other => panic!("expected HandlerError, got {:?}", other.map(|c| c.len())),
  }
}

#[tokio::test]
#[serial]
async fn test_missing_and_mistyped_context_keys_surface_from_require() {
  setup_tracing();
  const AMOUNT: Key<u64> = Key::new("amount");
  const AMOUNT_AS_TEXT: Key<String> = Key::new("amount");

  let mut pipeline = Pipeline::<StepwiseError>::from_names(&["read_amount"]);
  pipeline.on("read_amount", |ctx: Context| async move {
    let _text = ctx.require(AMOUNT_AS_TEXT)?;
    Ok::<(), StepwiseError>(())
  });

  match pipeline.run(Context::new()).await {
    Err(StepwiseError::MissingKey { key }) => assert_eq!(key, "amount"),
    other => panic!("expected MissingKey, got {:?}", other.map(|c| c.len())),
  }

  match pipeline.run(Context::new().with(AMOUNT, 5)).await {
    Err(StepwiseError::TypeMismatch {
      key,
      expected_type,
      found_type,
    }) => {
      assert_eq!(key, "amount");
      assert!(expected_type.contains("String"));
      assert_eq!(found_type, "u64");
    }
    other => panic!("expected TypeMismatch, got {:?}", other.map(|c| c.len())),
  }
}

#[tokio::test]
#[serial]
async fn test_error_returned_is_the_failing_steps_error_unchanged() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestError>::from_names(&["first", "second"]);
  pipeline.on("first", create_failing_handler("first", "first broke"));
  pipeline.on("second", create_failing_handler("second", "second broke"));

  let err = pipeline.run(Context::new()).await.unwrap_err();
  assert_eq!(err, TestError::Handler("first broke".to_string()));
}
