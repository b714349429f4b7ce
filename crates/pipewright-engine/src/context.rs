//! Run-scoped store of task outputs.
//!
//! One store exists per pipeline run. It knows which task ids the run was
//! started with, so a read can tell "not written yet" apart from "no such
//! task in this run".

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use pipewright_task::Lookup;
use serde_json::Value;

use crate::error::EngineError;

/// Copy of every output recorded so far, keyed by task id.
pub type ContextSnapshot = HashMap<String, Value>;

/// Write-once mapping from task id to output, shared by all tasks of a run.
#[derive(Debug, Default)]
pub struct ContextStore {
  expected: HashSet<String>,
  outputs: RwLock<HashMap<String, Value>>,
}

impl ContextStore {
  /// Create a store for a run made of the given task ids.
  pub fn new<I, S>(expected: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      expected: expected.into_iter().map(Into::into).collect(),
      outputs: RwLock::new(HashMap::new()),
    }
  }

  /// Read a task's output.
  pub fn get(&self, task_id: &str) -> Lookup {
    let outputs = self.outputs.read().unwrap_or_else(|e| e.into_inner());
    match outputs.get(task_id) {
      Some(value) => Lookup::Ready(value.clone()),
      None if self.expected.contains(task_id) => Lookup::Pending,
      None => Lookup::Unknown,
    }
  }

  /// Record a task's output. Each id can be written once.
  pub fn set(&self, task_id: &str, output: Value) -> Result<(), EngineError> {
    // A poisoned lock still holds a consistent map: inserts are the only writes.
    let mut outputs = self.outputs.write().unwrap_or_else(|e| e.into_inner());
    if outputs.contains_key(task_id) {
      return Err(EngineError::OutputAlreadyRecorded {
        task_id: task_id.to_string(),
      });
    }
    outputs.insert(task_id.to_string(), output);
    Ok(())
  }

  pub fn contains(&self, task_id: &str) -> bool {
    self
      .outputs
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .contains_key(task_id)
  }

  pub fn snapshot(&self) -> ContextSnapshot {
    self.outputs.read().unwrap_or_else(|e| e.into_inner()).clone()
  }

  pub fn len(&self) -> usize {
    self.outputs.read().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::Arc;

  #[test]
  fn test_lookup_states() {
    let store = ContextStore::new(["t1", "t2"]);
    store.set("t1", json!(20)).unwrap();

    assert_eq!(store.get("t1"), Lookup::Ready(json!(20)));
    assert_eq!(store.get("t2"), Lookup::Pending);
    assert_eq!(store.get("t3"), Lookup::Unknown);
  }

  #[test]
  fn test_null_output_is_ready() {
    let store = ContextStore::new(["t1"]);
    store.set("t1", serde_json::Value::Null).unwrap();
    assert_eq!(store.get("t1"), Lookup::Ready(serde_json::Value::Null));
  }

  #[test]
  fn test_write_once() {
    let store = ContextStore::new(["t1"]);
    store.set("t1", json!(1)).unwrap();

    let err = store.set("t1", json!(2)).unwrap_err();
    assert!(matches!(err, EngineError::OutputAlreadyRecorded { ref task_id } if task_id == "t1"));
    assert_eq!(store.get("t1"), Lookup::Ready(json!(1)));
  }

  #[test]
  fn test_snapshot() {
    let store = ContextStore::new(["a", "b"]);
    assert!(store.is_empty());
    store.set("a", json!("x")).unwrap();
    store.set("b", json!([1, 2])).unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["a"], json!("x"));
    assert_eq!(snapshot["b"], json!([1, 2]));
    assert_eq!(store.len(), 2);
    assert!(store.contains("a"));
  }

  #[test]
  fn test_concurrent_writes() {
    let ids: Vec<String> = (0..32).map(|i| format!("t{}", i)).collect();
    let store = Arc::new(ContextStore::new(ids.clone()));

    let handles: Vec<_> = ids
      .into_iter()
      .enumerate()
      .map(|(i, id)| {
        let store = store.clone();
        std::thread::spawn(move || store.set(&id, json!(i)))
      })
      .collect();
    for handle in handles {
      handle.join().unwrap().unwrap();
    }

    assert_eq!(store.len(), 32);
    assert_eq!(store.get("t7"), Lookup::Ready(json!(7)));
  }
}
