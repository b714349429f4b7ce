use serde::{Deserialize, Serialize};

use crate::input::TaskInputs;

/// Declarative description of one unit of work.
///
/// Fields beyond `id`, `type` and `inputs` are type-specific configuration
/// (an endpoint, an HTTP method, a function name, ...). They are kept as raw
/// JSON and interpreted by the executor registered for `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDef {
  pub id: String,
  #[serde(rename = "type")]
  pub task_type: String,
  #[serde(default)]
  pub inputs: TaskInputs,
  #[serde(flatten)]
  pub config: serde_json::Map<String, serde_json::Value>,
}

impl TaskDef {
  pub fn new(
    id: impl Into<String>,
    task_type: impl Into<String>,
    inputs: impl Into<TaskInputs>,
  ) -> Self {
    Self {
      id: id.into(),
      task_type: task_type.into(),
      inputs: inputs.into(),
      config: serde_json::Map::new(),
    }
  }

  /// Add a type-specific configuration field.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.config.insert(key.into(), value.into());
    self
  }

  /// Read a string configuration field.
  pub fn config_str(&self, key: &str) -> Option<&str> {
    self.config.get(key).and_then(|v| v.as_str())
  }
}
