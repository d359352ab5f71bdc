// stepwise/examples/error_handling.rs

use stepwise::{Context, Key, Pipeline, StepwiseError};
use tracing::{error, info};

// 1. Define a custom application error type
#[derive(Debug, thiserror::Error)]
enum ExampleAppError {
  #[error("A custom application error occurred: {0}")]
  CustomError(String),

  #[error("Stepwise framework error during pipeline execution: {0}")]
  Framework(#[from] StepwiseError),
}

const PROCESSED: Key<Vec<String>> = Key::new("processed_steps");

fn record(ctx: &Context, step: &str) -> Context {
  let mut processed = ctx.get(PROCESSED).cloned().unwrap_or_default();
  processed.push(step.to_string());
  Context::new().with(PROCESSED, processed)
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Error Handling Example ---");

  info!("\nScenario 1: Handler returns a custom error");
  run_pipeline_with_handler_error().await;

  info!("\nScenario 2: Framework error (HandlerMissing)");
  run_pipeline_with_framework_error().await;
}

async fn run_pipeline_with_handler_error() {
  let mut pipeline = Pipeline::<ExampleAppError>::from_names(&["step_one", "step_two_fails", "step_three"]);

  pipeline.on("step_one", |ctx: Context| async move {
    info!("Executing step_one");
    Ok::<_, ExampleAppError>(record(&ctx, "step_one"))
  });
  pipeline.on("step_two_fails", |_ctx: Context| async move {
    info!("Executing step_two_fails - this will error");
    Err::<(), _>(ExampleAppError::CustomError("Something went wrong in step_two!".to_string()))
  });
  pipeline.on("step_three", |ctx: Context| async move {
    info!("Executing step_three (should not be reached)");
    Ok::<_, ExampleAppError>(record(&ctx, "step_three"))
  });

  match pipeline.run(Context::new()).await {
    Ok(ctx) => error!("Pipeline unexpectedly succeeded: {:?}", ctx),
    Err(ExampleAppError::CustomError(msg)) => {
      info!("Pipeline failed as expected: {}", msg);
      assert!(msg.contains("Something went wrong in step_two!"));
    }
    Err(e) => error!("Unexpected error type: {:?}", e),
  }
}

async fn run_pipeline_with_framework_error() {
  let mut pipeline = Pipeline::<ExampleAppError>::from_names(&["step_alpha", "step_beta_no_handler", "step_gamma"]);
  pipeline.on("step_alpha", |ctx: Context| async move {
    info!("Executing step_alpha");
    Ok::<_, ExampleAppError>(record(&ctx, "step_alpha"))
  });
  // No handler for "step_beta_no_handler"

  match pipeline.run(Context::new()).await {
    Ok(ctx) => error!("Pipeline unexpectedly succeeded (framework error test): {:?}", ctx),
    Err(ExampleAppError::Framework(StepwiseError::HandlerMissing { step_name })) => {
      info!("Pipeline failed with framework error as expected at '{}'", step_name);
      assert_eq!(step_name, "step_beta_no_handler");
    }
    Err(e) => error!("Unexpected error: {:?}", e),
  }
}
