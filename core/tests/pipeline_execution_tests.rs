// tests/pipeline_execution_tests.rs
mod common; // Reference the common module

use common::*;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use stepwise::{pipe, Context, Key, Pipeline, StepDecl, StepOutput, StepwiseError};

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  reset_counters();
  let mut pipeline = Pipeline::<TestError>::from_names(&["step1", "step2", "step3"]);

  pipeline.on("step1", create_simple_handler("step1", " S1"));
  pipeline.on("step2", create_simple_handler("step2", " S2"));
  pipeline.on("step3", create_simple_handler("step3", " S3"));

  let result = pipeline.run(Context::new()).await;
  let ctx = result.expect("pipeline should complete");

  assert_eq!(ctx.get(COUNTER), Some(&3));
  assert_eq!(ctx.get(MESSAGE).map(String::as_str), Some(" S1 S2 S3"));
  assert_eq!(trace_of(&ctx), vec!["step1", "step2", "step3"]);
  assert_eq!(handler_exec_count(), 3);
}

#[tokio::test]
#[serial]
async fn test_each_step_sees_prior_outputs_even_when_slow() {
  setup_tracing();
  const FIRST: Key<u64> = Key::new("first");
  const SECOND: Key<u64> = Key::new("second");

  let mut pipeline = Pipeline::<TestError>::from_names(&["slow", "fast"]);
  pipeline.on("slow", |_ctx: Context| async move {
    tokio::time::sleep(Duration::from_millis(30)).await;
    Ok::<_, TestError>(Context::new().with(FIRST, 7))
  });
  pipeline.on("fast", |ctx: Context| async move {
    // Would be None if this step had started before "slow" resolved.
    let first = *ctx.get(FIRST).ok_or_else(|| TestError::Handler("first missing".into()))?;
    Ok::<_, TestError>(Context::new().with(SECOND, first * 2))
  });

  let ctx = pipeline.run(Context::new()).await.unwrap();
  assert_eq!(ctx.get(SECOND), Some(&14));
}

#[tokio::test]
#[serial]
async fn test_merge_is_last_write_wins_and_keeps_unrelated_keys() {
  setup_tracing();
  const A: Key<i32> = Key::new("a");
  const B: Key<i32> = Key::new("b");
  const C: Key<i32> = Key::new("c");

  let mut pipeline = Pipeline::<TestError>::from_names(&["overwrite", "observe"]);
  pipeline.on("overwrite", |_ctx: Context| async move {
    Ok::<_, TestError>(Context::new().with(B, 3).with(C, 4))
  });
  pipeline.observe("observe", |ctx: &Context| {
    tracing::info!(keys = ?ctx.keys().collect::<Vec<_>>(), "observed");
  });

  let ctx = pipeline.run(Context::new().with(A, 1).with(B, 2)).await.unwrap();
  assert_eq!(ctx.get(A), Some(&1));
  assert_eq!(ctx.get(B), Some(&3));
  assert_eq!(ctx.get(C), Some(&4));
  assert_eq!(ctx.len(), 3);
}

#[tokio::test]
#[serial]
async fn test_void_step_leaves_context_unchanged() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestError>::from_names(&["noop"]);
  pipeline.on("noop", |_ctx: Context| async move { Ok::<(), TestError>(()) });

  let initial = Context::new().with(COUNTER, 41);
  let ctx = pipeline.run(initial).await.unwrap();
  assert_eq!(ctx.get(COUNTER), Some(&41));
  assert_eq!(ctx.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_pipeline_propagates_handler_error_and_stops() {
  setup_tracing();
  reset_counters();
  let mut pipeline = Pipeline::<TestError>::from_names(&["good_step", "bad_step", "another_step"]);

  pipeline.on("good_step", create_simple_handler("good_step", "Good"));
  pipeline.on("bad_step", create_failing_handler("bad_step", "I am a bad step!"));
  pipeline.on("another_step", create_simple_handler("another_step", "NeverRun"));

  let result = pipeline.run(Context::new()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("I am a bad step!".to_string()));
  // good_step and bad_step ran, another_step never did.
  assert_eq!(handler_exec_count(), 2);
}

#[tokio::test]
#[serial]
async fn test_missing_handler_for_required_step_fails() {
  setup_tracing();
  let mut pipeline = Pipeline::<StepwiseError>::from_names(&["has_handler", "no_handler"]);
  pipeline.on("has_handler", |_ctx: Context| async move { Ok::<(), StepwiseError>(()) });

  match pipeline.run(Context::new()).await {
    Err(StepwiseError::HandlerMissing { step_name }) => assert_eq!(step_name, "no_handler"),
    other => panic!("expected HandlerMissing, got {:?}", other.map(|c| c.len())),
  }
}

#[tokio::test]
#[serial]
async fn test_optional_step_without_handler_is_skipped() {
  setup_tracing();
  reset_counters();
  let mut pipeline = Pipeline::<TestError>::new(&[
    StepDecl::new("first"),
    StepDecl::new("maybe").optional(),
    StepDecl::new("last"),
  ]);
  pipeline.on("first", create_simple_handler("first", "1"));
  pipeline.on("last", create_simple_handler("last", "3"));

  let ctx = pipeline.run(Context::new()).await.unwrap();
  assert_eq!(trace_of(&ctx), vec!["first", "last"]);
}

#[tokio::test]
#[serial]
async fn test_undeclared_input_is_rejected_before_any_step_runs() {
  setup_tracing();
  reset_counters();
  let mut pipeline = Pipeline::<TestError>::new(&[
    StepDecl::new("producer").produces(&["trace"]),
    StepDecl::new("consumer").reads(&["trace", "signers"]),
  ]);
  pipeline.on("producer", create_simple_handler("producer", "p"));
  pipeline.on("consumer", create_simple_handler("consumer", "c"));

  let err = pipeline.run(Context::new()).await.unwrap_err();
  assert!(matches!(err, TestError::Stepwise(ref msg) if msg.contains("UnsatisfiedInput") && msg.contains("signers")));
  assert_eq!(handler_exec_count(), 0);

  // Supplying the key up front satisfies the declaration.
  let initial = Context::new().with(Key::<Vec<String>>::new("signers"), vec![]);
  assert!(pipeline.check_dependencies(&initial).is_ok());
  assert!(pipeline.run(initial).await.is_ok());
}

#[tokio::test]
#[serial]
async fn test_structural_edits() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestError>::from_names(&["a", "c"]);
  pipeline.insert_before_step("c", "b");
  pipeline.insert_after_step("c", StepDecl::new("d").optional());
  pipeline.push_step("e");
  pipeline.remove_step("e");
  pipeline.remove_step("does_not_exist");
  assert_eq!(pipeline.step_names(), vec!["a", "b", "c", "d"]);

  for name in ["a", "b", "c"] {
    pipeline.on(name, create_simple_handler(name, ""));
  }
  let ctx = pipeline.run(Context::new()).await.unwrap();
  assert_eq!(trace_of(&ctx), vec!["a", "b", "c"]);
}

#[test]
#[should_panic(expected = "not found in pipeline definition")]
fn test_registering_handler_for_unknown_step_panics() {
  let mut pipeline = Pipeline::<TestError>::from_names(&["a"]);
  pipeline.on("typo", create_simple_handler("typo", ""));
}

#[tokio::test]
#[serial]
async fn test_pipeline_is_reusable_across_runs() {
  setup_tracing();
  let pipeline = {
    let mut p = Pipeline::<TestError>::from_names(&["count"]);
    p.on("count", create_simple_handler("count", "x"));
    Arc::new(p)
  };

  let first = pipeline.run(Context::new()).await.unwrap();
  let second = pipeline.run(Context::new()).await.unwrap();
  assert_eq!(first.get(COUNTER), Some(&1));
  assert_eq!(second.get(COUNTER), Some(&1));
}

#[tokio::test]
#[serial]
async fn test_pipe_composes_ad_hoc_steps() {
  setup_tracing();
  let noop: stepwise::Handler<TestError> =
    Box::new(|_ctx: Context| Box::pin(async { Ok::<_, TestError>(StepOutput::Unchanged) }));
  let ctx = pipe(
    Context::new().with(MESSAGE, "init".to_string()),
    vec![create_simple_handler("one", "+1"), noop, create_simple_handler("two", "+2")],
  )
  .await
  .unwrap();

  assert_eq!(ctx.get(MESSAGE).map(String::as_str), Some("init+1+2"));
  assert_eq!(trace_of(&ctx), vec!["one", "two"]);
}

#[tokio::test]
#[serial]
async fn test_pipe_with_no_steps_returns_initial() {
  setup_tracing();
  let ctx = pipe::<TestError>(Context::new().with(COUNTER, 5), Vec::new()).await.unwrap();
  assert_eq!(ctx.get(COUNTER), Some(&5));
  assert_eq!(ctx.len(), 1);
}
