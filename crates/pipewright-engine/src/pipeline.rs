//! Pipeline scheduler.
//!
//! [`Pipeline`] drives a full run over a caller-ordered task list in one of
//! two modes:
//!
//! - **Sequential**: tasks run one after another in list order. A task's
//!   output is recorded before the next task starts. The first failure aborts
//!   the run and no further task starts.
//! - **Parallel**: every task is spawned at once with no ordering between
//!   them. A task that references another task's output sees whatever is
//!   recorded when it starts, possibly `Lookup::Pending`. Failures do not
//!   stop sibling tasks; the first failure observed is returned after every
//!   task has finished.
//!
//! Either way the run ends with a single `done` event when nothing failed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use pipewright_config::{ExecutionMode, TaskDef};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use crate::context::{ContextSnapshot, ContextStore};
use crate::error::{EngineError, PipelineError, panic_message};
use crate::events::{PipelineEvent, StatusSink, deliver};
use crate::registry::ExecutorRegistry;
use crate::runner::TaskRunner;

/// Scheduler configuration, fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
  pub mode: ExecutionMode,
  /// Upper bound on tasks running at once in parallel mode. `None` starts
  /// every task immediately.
  pub max_concurrency: Option<usize>,
  /// Per-task execution limit. `None` waits indefinitely.
  pub task_timeout: Option<Duration>,
}

impl PipelineConfig {
  pub fn sequential() -> Self {
    Self {
      mode: ExecutionMode::Sequential,
      ..Self::default()
    }
  }

  pub fn parallel() -> Self {
    Self {
      mode: ExecutionMode::Parallel,
      ..Self::default()
    }
  }

  pub fn with_max_concurrency(mut self, limit: usize) -> Self {
    self.max_concurrency = Some(limit);
    self
  }

  pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
    self.task_timeout = Some(timeout);
    self
  }
}

/// Result of a run in which every task completed.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
  /// Unique id of this run, as recorded in logs.
  pub run_id: String,
  /// Output of every task, keyed by task id.
  pub outputs: ContextSnapshot,
}

/// Runs task lists against an executor registry.
pub struct Pipeline {
  registry: Arc<ExecutorRegistry>,
  config: PipelineConfig,
}

impl Pipeline {
  pub fn new(registry: impl Into<Arc<ExecutorRegistry>>, config: PipelineConfig) -> Self {
    Self {
      registry: registry.into(),
      config,
    }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn registry(&self) -> &ExecutorRegistry {
    &self.registry
  }

  /// Run a task list.
  ///
  /// Every task that finishes is reported to `sink`. On success a final
  /// `done` event carries all outputs, which are also returned. On failure
  /// no `done` event is emitted and the error carries the outputs recorded
  /// before the run stopped.
  #[instrument(
    name = "pipeline_run",
    skip(self, tasks, sink),
    fields(
      run_id = tracing::field::Empty,
      mode = %self.config.mode,
      tasks = tasks.len(),
    )
  )]
  pub async fn run(
    &self,
    tasks: &[TaskDef],
    sink: Arc<dyn StatusSink>,
  ) -> Result<RunResult, PipelineError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    tracing::Span::current().record("run_id", run_id.as_str());

    info!(run_id = %run_id, "pipeline_started");

    let store = Arc::new(ContextStore::new(tasks.iter().map(|t| t.id.clone())));
    let runner = TaskRunner::new(
      run_id.clone(),
      self.registry.clone(),
      store.clone(),
      sink.clone(),
    )
    .with_timeout(self.config.task_timeout);

    let result = match validate(tasks) {
      Ok(()) => match self.config.mode {
        ExecutionMode::Sequential => run_sequential(&runner, tasks).await,
        ExecutionMode::Parallel => run_parallel(&runner, tasks, self.config.max_concurrency).await,
      },
      Err(e) => Err(e),
    };

    let outputs = store.snapshot();
    match result {
      Ok(()) => {
        info!(run_id = %run_id, outputs = outputs.len(), "pipeline_completed");
        deliver(
          sink.as_ref(),
          PipelineEvent::Done {
            outputs: outputs.clone(),
          },
        );
        Ok(RunResult { run_id, outputs })
      }
      Err(error) => {
        error!(run_id = %run_id, error = %error, "pipeline_aborted");
        Err(PipelineError {
          run_id,
          error,
          outputs,
        })
      }
    }
  }
}

/// Reject task lists with repeated ids before anything runs.
fn validate(tasks: &[TaskDef]) -> Result<(), EngineError> {
  let mut seen = HashSet::with_capacity(tasks.len());
  for task in tasks {
    if !seen.insert(task.id.as_str()) {
      return Err(EngineError::DuplicateTaskId {
        task_id: task.id.clone(),
      });
    }
  }
  Ok(())
}

async fn run_sequential(runner: &TaskRunner, tasks: &[TaskDef]) -> Result<(), EngineError> {
  for task in tasks {
    runner.run(task).await?;
  }
  Ok(())
}

async fn run_parallel(
  runner: &TaskRunner,
  tasks: &[TaskDef],
  max_concurrency: Option<usize>,
) -> Result<(), EngineError> {
  let limiter = max_concurrency.map(concurrency_limiter);

  let mut running = FuturesUnordered::new();
  for task in tasks {
    let runner = runner.clone();
    let task = task.clone();
    let task_id = task.id.clone();
    let limiter = limiter.clone();

    let handle = tokio::spawn(async move {
      let _permit = match limiter {
        Some(semaphore) => Some(semaphore.acquire_owned().await.map_err(|e| {
          EngineError::Join {
            message: format!("concurrency limiter closed: {}", e),
          }
        })?),
        None => None,
      };
      runner.run(&task).await
    });
    running.push(async move { (task_id, handle.await) });
  }

  // Drain in completion order; keep the first failure, let the rest finish.
  let mut first_failure = None;
  while let Some((task_id, joined)) = running.next().await {
    let outcome = match joined {
      Ok(result) => result.map(|_| ()),
      Err(e) if e.is_panic() => Err(EngineError::Panicked {
        message: panic_message(e.into_panic().as_ref()),
        task_id,
      }),
      Err(e) => Err(EngineError::Join {
        message: e.to_string(),
      }),
    };

    if let Err(e) = outcome {
      match first_failure {
        None => first_failure = Some(e),
        Some(_) => warn!(error = %e, "additional task failure"),
      }
    }
  }

  match first_failure {
    Some(e) => Err(e),
    None => Ok(()),
  }
}

/// Semaphore admitting at most `limit` tasks, kept within what tokio allows.
fn concurrency_limiter(limit: usize) -> Arc<Semaphore> {
  Arc::new(Semaphore::new(limit.clamp(1, Semaphore::MAX_PERMITS)))
}
