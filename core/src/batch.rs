// stepwise/src/batch.rs

//! Sequential batch helpers.
//!
//! Each helper walks a list and awaits one async action per item before
//! touching the next. Nothing runs concurrently, and the first failure stops
//! the walk and is returned as is. Items after it are never visited.

use std::future::Future;
use tracing::{event, instrument, Level};

/// Applies `action` to every item in order. Resolves with the number of
/// items processed.
#[instrument(name = "batch::run_sequentially", skip_all, fields(item_type = %std::any::type_name::<T>()))]
pub async fn run_sequentially<I, T, F, Fut, O, E>(items: I, mut action: F) -> Result<usize, E>
where
  I: IntoIterator<Item = T>,
  F: FnMut(T) -> Fut,
  Fut: Future<Output = Result<O, E>>,
{
  let mut processed = 0usize;
  for item in items {
    event!(Level::TRACE, index = processed, "Running batch item.");
    action(item).await?;
    processed += 1;
  }
  event!(Level::DEBUG, processed, "Batch finished.");
  Ok(processed)
}

/// Like [`run_sequentially`], but keeps each item's output, in input order.
#[instrument(name = "batch::map_sequentially", skip_all, fields(item_type = %std::any::type_name::<T>()))]
pub async fn map_sequentially<I, T, F, Fut, O, E>(items: I, mut action: F) -> Result<Vec<O>, E>
where
  I: IntoIterator<Item = T>,
  F: FnMut(T) -> Fut,
  Fut: Future<Output = Result<O, E>>,
{
  let iter = items.into_iter();
  let mut outputs = Vec::with_capacity(iter.size_hint().0);
  for item in iter {
    outputs.push(action(item).await?);
  }
  event!(Level::DEBUG, processed = outputs.len(), "Batch finished.");
  Ok(outputs)
}

/// Walks `items` until the first `None`, which ends the batch normally.
/// Items after the gap are not visited.
#[instrument(name = "batch::run_until_missing", skip_all, fields(item_type = %std::any::type_name::<T>()))]
pub async fn run_until_missing<I, T, F, Fut, O, E>(items: I, mut action: F) -> Result<usize, E>
where
  I: IntoIterator<Item = Option<T>>,
  F: FnMut(T) -> Fut,
  Fut: Future<Output = Result<O, E>>,
{
  let mut processed = 0usize;
  for item in items {
    let Some(item) = item else {
      event!(Level::DEBUG, processed, "Batch reached a missing item, stopping.");
      break;
    };
    action(item).await?;
    processed += 1;
  }
  Ok(processed)
}
