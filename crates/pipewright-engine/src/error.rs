//! Engine error types.

use std::any::Any;

use pipewright_task::TaskError;

use crate::context::ContextSnapshot;

/// Errors that can occur while running tasks.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// No executor is registered for the task's type tag.
  #[error("unknown task type '{task_type}'")]
  UnknownTaskType { task_type: String },

  /// The executor reported a failure.
  #[error("task '{task_id}' failed: {source}")]
  TaskExecution {
    task_id: String,
    #[source]
    source: TaskError,
  },

  /// The executor panicked.
  #[error("task '{task_id}' panicked: {message}")]
  Panicked { task_id: String, message: String },

  /// The executor did not finish within the configured task timeout.
  #[error("task '{task_id}' timed out after {timeout_ms}ms")]
  Timeout { task_id: String, timeout_ms: u64 },

  /// A second output was written for the same task id.
  #[error("output for task '{task_id}' was already recorded")]
  OutputAlreadyRecorded { task_id: String },

  /// Two descriptors in the same task list share an id.
  #[error("duplicate task id '{task_id}'")]
  DuplicateTaskId { task_id: String },

  /// A spawned task could not be joined.
  #[error("task join error: {message}")]
  Join { message: String },
}

impl EngineError {
  /// The task this error is attributed to, if any.
  pub fn task_id(&self) -> Option<&str> {
    match self {
      EngineError::TaskExecution { task_id, .. }
      | EngineError::Panicked { task_id, .. }
      | EngineError::Timeout { task_id, .. }
      | EngineError::OutputAlreadyRecorded { task_id }
      | EngineError::DuplicateTaskId { task_id } => Some(task_id),
      EngineError::UnknownTaskType { .. } | EngineError::Join { .. } => None,
    }
  }
}

/// A pipeline run that did not finish cleanly.
///
/// Carries the outputs recorded before the run stopped, so callers can see
/// which tasks completed.
#[derive(Debug, thiserror::Error)]
#[error("pipeline run {run_id} aborted: {error}")]
pub struct PipelineError {
  pub run_id: String,
  #[source]
  pub error: EngineError,
  pub outputs: ContextSnapshot,
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic".to_string()
  }
}
