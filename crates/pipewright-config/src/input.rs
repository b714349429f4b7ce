use serde::{Deserialize, Serialize};

/// Declared inputs of a task.
///
/// A JSON string names another task whose output becomes this task's input.
/// A JSON object is passed to the executor as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskInputs {
  Reference(String),
  Params(serde_json::Map<String, serde_json::Value>),
}

impl TaskInputs {
  /// The referenced task id, if these inputs point at another task.
  pub fn reference(&self) -> Option<&str> {
    match self {
      TaskInputs::Reference(id) => Some(id),
      TaskInputs::Params(_) => None,
    }
  }
}

impl Default for TaskInputs {
  fn default() -> Self {
    TaskInputs::Params(serde_json::Map::new())
  }
}

impl From<&str> for TaskInputs {
  fn from(id: &str) -> Self {
    TaskInputs::Reference(id.to_string())
  }
}

impl From<serde_json::Map<String, serde_json::Value>> for TaskInputs {
  fn from(params: serde_json::Map<String, serde_json::Value>) -> Self {
    TaskInputs::Params(params)
  }
}
