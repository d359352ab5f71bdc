// tests/batch_tests.rs
mod common;

use common::*;
use parking_lot::Mutex;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stepwise::{map_sequentially, run_sequentially, run_until_missing};

#[tokio::test]
#[serial]
async fn test_run_sequentially_visits_every_item_once_in_order() {
  setup_tracing();
  let seen = Arc::new(Mutex::new(Vec::new()));

  let processed = run_sequentially(vec!["wbtc", "cvx", "usdc"], |item| {
    let seen = seen.clone();
    async move {
      seen.lock().push(item);
      Ok::<_, TestError>(())
    }
  })
  .await
  .unwrap();

  assert_eq!(processed, 3);
  assert_eq!(*seen.lock(), vec!["wbtc", "cvx", "usdc"]);
}

#[tokio::test]
#[serial]
async fn test_run_sequentially_never_overlaps_items() {
  setup_tracing();
  let in_flight = Arc::new(AtomicUsize::new(0));
  let max_in_flight = Arc::new(AtomicUsize::new(0));

  run_sequentially(0..5u64, |i| {
    let in_flight = in_flight.clone();
    let max_in_flight = max_in_flight.clone();
    async move {
      let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
      max_in_flight.fetch_max(now, Ordering::SeqCst);
      // Later items sleep less; overlap would reorder completion.
      tokio::time::sleep(Duration::from_millis(10 * (5 - i))).await;
      in_flight.fetch_sub(1, Ordering::SeqCst);
      Ok::<_, TestError>(())
    }
  })
  .await
  .unwrap();

  assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[serial]
async fn test_empty_batch_resolves_immediately() {
  setup_tracing();
  let processed = run_sequentially(Vec::<u32>::new(), |_| async { Ok::<_, TestError>(()) })
    .await
    .unwrap();
  assert_eq!(processed, 0);
}

#[tokio::test]
#[serial]
async fn test_failure_stops_batch_at_failing_item() {
  setup_tracing();
  let visited = Arc::new(Mutex::new(Vec::new()));

  let result = run_sequentially(1..=5, |i| {
    let visited = visited.clone();
    async move {
      visited.lock().push(i);
      if i == 3 {
        return Err(TestError::Handler(format!("item {} failed", i)));
      }
      Ok(())
    }
  })
  .await;

  assert_eq!(result, Err(TestError::Handler("item 3 failed".to_string())));
  assert_eq!(*visited.lock(), vec![1, 2, 3]);
}

#[tokio::test]
#[serial]
async fn test_map_sequentially_keeps_outputs_in_input_order() {
  setup_tracing();
  let outputs = map_sequentially(["gac", "citadel", "xCitadel"], |name| async move {
    Ok::<_, TestError>(format!("{}-deployed", name))
  })
  .await
  .unwrap();
  assert_eq!(outputs, vec!["gac-deployed", "citadel-deployed", "xCitadel-deployed"]);
}

#[tokio::test]
#[serial]
async fn test_run_until_missing_stops_at_first_gap() {
  setup_tracing();
  let visited = Arc::new(Mutex::new(Vec::new()));

  let processed = run_until_missing(vec![Some(1), Some(2), None, Some(4)], |i| {
    let visited = visited.clone();
    async move {
      visited.lock().push(i);
      Ok::<_, TestError>(())
    }
  })
  .await
  .unwrap();

  assert_eq!(processed, 2);
  assert_eq!(*visited.lock(), vec![1, 2]);
}

#[tokio::test]
#[serial]
async fn test_long_batches_do_not_grow_the_stack() {
  setup_tracing();
  let processed = run_sequentially(0..100_000u32, |_| async { Ok::<_, TestError>(()) })
    .await
    .unwrap();
  assert_eq!(processed, 100_000);
}
