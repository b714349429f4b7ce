use pipewright_config::TaskDef;
use serde_json::Value;

/// Result of reading a task's output from the run's context.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
  /// The task has completed and recorded this output.
  Ready(Value),
  /// The task is part of this run but has not recorded an output yet.
  Pending,
  /// No task with this id is part of this run.
  Unknown,
}

impl Lookup {
  pub fn is_ready(&self) -> bool {
    matches!(self, Lookup::Ready(_))
  }

  /// The recorded output, if any.
  pub fn value(&self) -> Option<&Value> {
    match self {
      Lookup::Ready(value) => Some(value),
      Lookup::Pending | Lookup::Unknown => None,
    }
  }
}

/// Input handed to an executor after resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskInput {
  /// Parameters declared inline on the task.
  Params(serde_json::Map<String, Value>),
  /// Output of another task, as it stood when this task started.
  Upstream { task_id: String, lookup: Lookup },
}

impl TaskInput {
  /// The input as a single JSON value.
  ///
  /// An upstream output that is not available resolves to `null`.
  pub fn value(&self) -> Value {
    match self {
      TaskInput::Params(params) => Value::Object(params.clone()),
      TaskInput::Upstream { lookup, .. } => lookup.value().cloned().unwrap_or(Value::Null),
    }
  }

  /// Inline parameters, or an upstream output that is a JSON object.
  pub fn params(&self) -> Option<&serde_json::Map<String, Value>> {
    match self {
      TaskInput::Params(params) => Some(params),
      TaskInput::Upstream { lookup, .. } => lookup.value().and_then(Value::as_object),
    }
  }

  /// The upstream output, when one was declared and is available.
  pub fn upstream(&self) -> Option<&Value> {
    match self {
      TaskInput::Params(_) => None,
      TaskInput::Upstream { lookup, .. } => lookup.value(),
    }
  }
}

/// Context provided to an executor for one task.
#[derive(Debug, Clone)]
pub struct TaskContext {
  /// Pipeline run this task belongs to.
  pub run_id: String,

  /// The task descriptor being executed.
  pub task: TaskDef,

  /// Resolved input.
  pub input: TaskInput,
}

impl TaskContext {
  pub fn new(run_id: impl Into<String>, task: TaskDef, input: TaskInput) -> Self {
    Self {
      run_id: run_id.into(),
      task,
      input,
    }
  }

  /// Deserialize the task's type-specific configuration.
  pub fn config<T: serde::de::DeserializeOwned>(&self) -> Result<T, crate::TaskError> {
    serde_json::from_value(Value::Object(self.task.config.clone())).map_err(|e| {
      crate::TaskError::Configuration {
        message: format!("task '{}': {}", self.task.id, e),
      }
    })
  }
}
