// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use stepwise::{Context, Key, StepOutput, StepwiseError};
use tracing::Level;

// --- Common Context Keys ---
pub const TRACE: Key<Vec<String>> = Key::new("trace");
pub const COUNTER: Key<i32> = Key::new("counter");
pub const MESSAGE: Key<String> = Key::new("message");

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Stepwise framework error: {0}")]
  Stepwise(String), // Store as String for Eq comparison

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<StepwiseError> for TestError {
  fn from(err: StepwiseError) -> Self {
    TestError::Stepwise(format!("{:?}", err))
  }
}

pub fn trace_of(ctx: &Context) -> Vec<String> {
  ctx.get(TRACE).cloned().unwrap_or_default()
}

// --- Common Handler Creators ---

/// Appends `step_name` to the trace, bumps the counter and appends to the message.
pub fn create_simple_handler(step_name: &'static str, message_to_append: &'static str) -> stepwise::Handler<TestError> {
  Box::new(move |ctx: Context| {
    Box::pin(async move {
      HANDLER_EXEC_COUNTER.fetch_add(1, Ordering::SeqCst);
      let mut trace = trace_of(&ctx);
      trace.push(step_name.to_string());
      let counter = ctx.get(COUNTER).copied().unwrap_or_default() + 1;
      let message = format!("{}{}", ctx.get(MESSAGE).cloned().unwrap_or_default(), message_to_append);
      tracing::debug!(target: "test_handlers", step = %step_name, "executed, counter: {}, message: '{}'", counter, message);
      Ok::<_, TestError>(StepOutput::Merge(
        Context::new()
          .with(TRACE, trace)
          .with(COUNTER, counter)
          .with(MESSAGE, message),
      ))
    })
  })
}

pub fn create_failing_handler(step_name: &'static str, error_message: &'static str) -> stepwise::Handler<TestError> {
  Box::new(move |_ctx: Context| {
    Box::pin(async move {
      HANDLER_EXEC_COUNTER.fetch_add(1, Ordering::SeqCst);
      tracing::warn!(target: "test_handlers", step = %step_name, "failing with: '{}'", error_message);
      Err::<StepOutput, _>(TestError::Handler(error_message.to_string()))
    })
  })
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Atomic counters for checking execution counts ---
pub static HANDLER_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  HANDLER_EXEC_COUNTER.store(0, Ordering::SeqCst);
}

pub fn handler_exec_count() -> usize {
  HANDLER_EXEC_COUNTER.load(Ordering::SeqCst)
}
