use serde::{Deserialize, Serialize};

use crate::enums::ExecutionMode;
use crate::task::TaskDef;

/// A pipeline file: a named, ordered task list and the mode to run it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDef {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub mode: ExecutionMode,
  pub tasks: Vec<TaskDef>,
}

impl PipelineDef {
  /// Parse a pipeline definition from JSON text.
  pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(text)
  }
}
