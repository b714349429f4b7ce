use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the scheduler drives the task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
  /// One task at a time, in list order. The first failure aborts the run.
  #[default]
  Sequential,
  /// Every task started at once with no ordering between them. Failures are
  /// reported after all tasks have finished.
  #[serde(alias = "concurrent")]
  Parallel,
}

impl ExecutionMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      ExecutionMode::Sequential => "sequential",
      ExecutionMode::Parallel => "parallel",
    }
  }
}

impl fmt::Display for ExecutionMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ExecutionMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "sequential" => Ok(ExecutionMode::Sequential),
      "parallel" | "concurrent" => Ok(ExecutionMode::Parallel),
      other => Err(format!("unknown execution mode: {}", other)),
    }
  }
}
