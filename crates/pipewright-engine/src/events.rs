//! Status events and sinks.
//!
//! The engine reports one event per finished task and, when a run succeeds,
//! a final `done` event carrying every recorded output. Consumers implement
//! [`StatusSink`] to print, stream or persist them.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::error;

use crate::context::ContextSnapshot;
use crate::error::panic_message;

/// Task id used for run-level events.
pub const PIPELINE_ID: &str = "pipeline";

/// Status carried by a [`PipelineEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  Completed,
  Failed,
  Done,
}

impl TaskStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      TaskStatus::Completed => "completed",
      TaskStatus::Failed => "failed",
      TaskStatus::Done => "done",
    }
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Events emitted during a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEvent {
  /// A task finished and its output was recorded.
  Completed {
    task_id: String,
    output: serde_json::Value,
  },

  /// A task failed.
  Failed { task_id: String, error: String },

  /// The whole run finished without failures.
  Done { outputs: ContextSnapshot },
}

impl PipelineEvent {
  /// The task this event is about; [`PIPELINE_ID`] for run-level events.
  pub fn task_id(&self) -> &str {
    match self {
      PipelineEvent::Completed { task_id, .. } | PipelineEvent::Failed { task_id, .. } => task_id,
      PipelineEvent::Done { .. } => PIPELINE_ID,
    }
  }

  pub fn status(&self) -> TaskStatus {
    match self {
      PipelineEvent::Completed { .. } => TaskStatus::Completed,
      PipelineEvent::Failed { .. } => TaskStatus::Failed,
      PipelineEvent::Done { .. } => TaskStatus::Done,
    }
  }

  /// The output, the error description, or the full context as an object.
  pub fn payload(&self) -> serde_json::Value {
    match self {
      PipelineEvent::Completed { output, .. } => output.clone(),
      PipelineEvent::Failed { error, .. } => serde_json::Value::String(error.clone()),
      PipelineEvent::Done { outputs } => serde_json::Value::Object(
        outputs
          .iter()
          .map(|(id, output)| (id.clone(), output.clone()))
          .collect(),
      ),
    }
  }
}

/// Receives status events.
///
/// Called from whichever tokio task finished the work, possibly from several
/// at once in parallel mode. A panic inside `notify` is caught and logged;
/// it does not change the outcome of the task or the run.
pub trait StatusSink: Send + Sync {
  fn notify(&self, event: PipelineEvent);
}

impl<F> StatusSink for F
where
  F: Fn(PipelineEvent) + Send + Sync,
{
  fn notify(&self, event: PipelineEvent) {
    self(event)
  }
}

/// Hand an event to a sink, containing any panic it raises.
pub(crate) fn deliver(sink: &dyn StatusSink, event: PipelineEvent) {
  let task_id = event.task_id().to_string();
  let status = event.status();
  if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sink.notify(event))) {
    error!(
      task_id = %task_id,
      status = %status,
      message = %panic_message(payload.as_ref()),
      "sink_panicked"
    );
  }
}

/// A sink that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

impl StatusSink for NoopSink {
  fn notify(&self, _event: PipelineEvent) {}
}

/// A sink that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
  // Unbounded so a slow consumer never stalls a running task. Volume is one
  // event per task plus one per run.
  sender: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
  pub fn new(sender: mpsc::UnboundedSender<PipelineEvent>) -> Self {
    Self { sender }
  }

  /// Create a sink together with the receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl StatusSink for ChannelSink {
  fn notify(&self, event: PipelineEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
