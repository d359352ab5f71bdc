// stepwise/src/core/context.rs

//! Defines the accumulated `Context` threaded through a pipeline, the typed
//! `Key<T>` used to address its entries, and the `Handler<Err>` type for
//! pipeline step handlers.

use crate::core::control::StepOutput;
use crate::error::{StepwiseError, StepwiseResult};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

// --- Handler Definition ---

/// Type alias for a pipeline step handler.
///
/// A handler is an asynchronous function that takes ownership of a snapshot
/// of the accumulated `Context` and returns a `Future` resolving to the step's
/// output: either a partial context to merge, or `StepOutput::Unchanged`.
///
/// Snapshots are cheap: entries are reference counted, so cloning a context
/// never clones the stored values.
pub type Handler<Err> =
  Box<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Result<StepOutput, Err>> + Send>> + Send + Sync>;

// --- Typed keys ---

/// A named, typed slot in a `Context`.
///
/// Keys are plain constants; the type parameter only drives downcasting.
///
/// ```
/// use stepwise::{Context, Key};
///
/// const GREETING: Key<String> = Key::new("greeting");
///
/// let ctx = Context::new().with(GREETING, "gm".to_string());
/// assert_eq!(ctx.get(GREETING).map(String::as_str), Some("gm"));
/// ```
pub struct Key<T> {
  name: &'static str,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
  pub const fn new(name: &'static str) -> Self {
    Self {
      name,
      _marker: PhantomData,
    }
  }

  pub const fn name(&self) -> &'static str {
    self.name
  }
}

impl<T> Clone for Key<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Key")
      .field("name", &self.name)
      .field("type", &std::any::type_name::<T>())
      .finish()
  }
}

// --- Context ---

#[derive(Clone)]
struct Entry {
  value: Arc<dyn Any + Send + Sync>,
  type_name: &'static str,
}

impl Entry {
  fn new<T: Any + Send + Sync>(value: T) -> Self {
    Self {
      value: Arc::new(value),
      type_name: std::any::type_name::<T>(),
    }
  }
}

/// String-keyed accumulator for the data flowing through a pipeline.
///
/// A context only ever grows: merging a partial context overwrites colliding
/// keys with the incoming value (last write wins) and never removes keys.
#[derive(Clone, Default)]
pub struct Context {
  entries: BTreeMap<String, Entry>,
}

impl Context {
  pub fn new() -> Self {
    Self::default()
  }

  /// Stores `value` under `key`, replacing any previous value.
  pub fn insert<T: Any + Send + Sync>(&mut self, key: Key<T>, value: T) {
    self.entries.insert(key.name.to_string(), Entry::new(value));
  }

  /// Builder form of [`Context::insert`].
  pub fn with<T: Any + Send + Sync>(mut self, key: Key<T>, value: T) -> Self {
    self.insert(key, value);
    self
  }

  /// Stores a value under a name only known at runtime, e.g. a contract
  /// instance name coming out of a batch.
  pub fn insert_named<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
    self.entries.insert(name.into(), Entry::new(value));
  }

  pub fn get<T: Any>(&self, key: Key<T>) -> Option<&T> {
    self.get_named(key.name)
  }

  pub fn get_named<T: Any>(&self, name: &str) -> Option<&T> {
    self.entries.get(name).and_then(|entry| (*entry.value).downcast_ref::<T>())
  }

  /// Like [`Context::get`], but a missing key or a type mismatch is an error.
  pub fn require<T: Any>(&self, key: Key<T>) -> StepwiseResult<&T> {
    self.require_named(key.name)
  }

  pub fn require_named<T: Any>(&self, name: &str) -> StepwiseResult<&T> {
    let entry = self
      .entries
      .get(name)
      .ok_or_else(|| StepwiseError::MissingKey { key: name.to_string() })?;
    (*entry.value)
      .downcast_ref::<T>()
      .ok_or_else(|| StepwiseError::TypeMismatch {
        key: name.to_string(),
        expected_type: std::any::type_name::<T>().to_string(),
        found_type: entry.type_name.to_string(),
      })
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Shallow merge. Keys in `partial` win over existing ones.
  pub fn merge(&mut self, partial: Context) {
    self.entries.extend(partial.entries);
  }
}

impl fmt::Debug for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map()
      .entries(self.entries.iter().map(|(name, entry)| (name, entry.type_name)))
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const COUNT: Key<u32> = Key::new("count");
  const LABEL: Key<String> = Key::new("label");

  #[test]
  fn merge_overwrites_and_keeps_untouched_keys() {
    let mut base = Context::new().with(COUNT, 1).with(LABEL, "base".to_string());
    base.merge(Context::new().with(COUNT, 2));

    assert_eq!(base.get(COUNT), Some(&2));
    assert_eq!(base.get(LABEL).map(String::as_str), Some("base"));
    assert_eq!(base.len(), 2);
  }

  #[test]
  fn require_reports_type_mismatch() {
    let ctx = Context::new().with(COUNT, 7);
    let wrong: Key<String> = Key::new("count");

    match ctx.require(wrong) {
      Err(StepwiseError::TypeMismatch { key, found_type, .. }) => {
        assert_eq!(key, "count");
        assert_eq!(found_type, "u32");
      }
      other => panic!("expected TypeMismatch, got {:?}", other),
    }
    assert!(matches!(ctx.require(LABEL), Err(StepwiseError::MissingKey { .. })));
  }

  #[test]
  fn clones_share_values() {
    let ctx = Context::new().with(LABEL, "shared".to_string());
    let snapshot = ctx.clone();
    let a = ctx.get(LABEL).map(|s| s as *const String);
    let b = snapshot.get(LABEL).map(|s| s as *const String);
    assert_eq!(a, b);
  }
}
