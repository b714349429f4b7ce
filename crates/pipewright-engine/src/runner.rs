//! Single task execution.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use pipewright_config::{TaskDef, TaskInputs};
use pipewright_task::{Lookup, TaskContext, TaskInput};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::context::ContextStore;
use crate::error::{EngineError, panic_message};
use crate::events::{PipelineEvent, StatusSink, deliver};
use crate::registry::ExecutorRegistry;

/// Runs one task descriptor to completion or failure.
///
/// Resolves the task's input from the run's [`ContextStore`], dispatches to
/// the executor registered for its type, records the output and reports the
/// outcome to the sink. Cloning is cheap; every clone shares the same store.
#[derive(Clone)]
pub struct TaskRunner {
  run_id: String,
  registry: Arc<ExecutorRegistry>,
  store: Arc<ContextStore>,
  sink: Arc<dyn StatusSink>,
  timeout: Option<Duration>,
}

impl TaskRunner {
  pub fn new(
    run_id: impl Into<String>,
    registry: Arc<ExecutorRegistry>,
    store: Arc<ContextStore>,
    sink: Arc<dyn StatusSink>,
  ) -> Self {
    Self {
      run_id: run_id.into(),
      registry,
      store,
      sink,
      timeout: None,
    }
  }

  /// Fail tasks whose executor runs longer than `timeout`.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn store(&self) -> &ContextStore {
    &self.store
  }

  /// Execute a task.
  ///
  /// Emits exactly one `Completed` or `Failed` event. Failures are returned
  /// to the caller after being reported.
  #[instrument(
    name = "task_run",
    skip(self, task),
    fields(
      run_id = %self.run_id,
      task_id = %task.id,
      task_type = %task.task_type,
    )
  )]
  pub async fn run(&self, task: &TaskDef) -> Result<Value, EngineError> {
    let result = self.run_inner(task).await;

    match &result {
      Ok(output) => {
        info!(output = %output, "task_completed");
        deliver(
          self.sink.as_ref(),
          PipelineEvent::Completed {
            task_id: task.id.clone(),
            output: output.clone(),
          },
        );
      }
      Err(e) => {
        error!(error = %e, "task_failed");
        deliver(
          self.sink.as_ref(),
          PipelineEvent::Failed {
            task_id: task.id.clone(),
            error: e.to_string(),
          },
        );
      }
    }

    result
  }

  async fn run_inner(&self, task: &TaskDef) -> Result<Value, EngineError> {
    let input = self.resolve_input(task);
    let executor = self.registry.lookup(&task.task_type)?;
    let ctx = TaskContext::new(self.run_id.clone(), task.clone(), input);

    info!("task_started");

    let execution = AssertUnwindSafe(executor.execute(&ctx)).catch_unwind();
    let outcome = match self.timeout {
      Some(limit) => tokio::time::timeout(limit, execution)
        .await
        .map_err(|_| EngineError::Timeout {
          task_id: task.id.clone(),
          timeout_ms: limit.as_millis() as u64,
        })?,
      None => execution.await,
    };

    let output = outcome
      .map_err(|payload| EngineError::Panicked {
        task_id: task.id.clone(),
        message: panic_message(payload.as_ref()),
      })?
      .map_err(|source| EngineError::TaskExecution {
        task_id: task.id.clone(),
        source,
      })?;

    self.store.set(&task.id, output.clone())?;
    Ok(output)
  }

  /// Resolve a task's declared inputs against the store.
  ///
  /// A reference to an output that is not available is not an error: the
  /// executor receives the `Pending`/`Unknown` lookup and decides.
  pub fn resolve_input(&self, task: &TaskDef) -> TaskInput {
    match &task.inputs {
      TaskInputs::Params(params) => TaskInput::Params(params.clone()),
      TaskInputs::Reference(upstream) => {
        let lookup = self.store.get(upstream);
        match &lookup {
          Lookup::Ready(_) => {}
          Lookup::Pending => {
            warn!(upstream = %upstream, "upstream output not yet available");
          }
          Lookup::Unknown => {
            warn!(upstream = %upstream, "upstream task is not part of this run");
          }
        }
        TaskInput::Upstream {
          task_id: upstream.clone(),
          lookup,
        }
      }
    }
  }
}
