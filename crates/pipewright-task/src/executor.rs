use async_trait::async_trait;

use crate::compute::ComputeExecutor;
use crate::error::TaskError;
use crate::http::HttpExecutor;
use crate::llm::TextGenerationExecutor;
use crate::types::TaskContext;

/// Capability that knows how to run one kind of task.
///
/// Implementations return the task's output on success. They never write to
/// the pipeline context themselves; the engine records the returned value
/// under the task's id.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
  async fn execute(&self, ctx: &TaskContext) -> Result<serde_json::Value, TaskError>;
}

/// The executors shipped with pipewright.
pub enum BuiltinExecutor {
  /// Named local functions.
  Compute(ComputeExecutor),
  /// Remote HTTP call.
  Http(HttpExecutor),
  /// Remote text generation.
  TextGeneration(TextGenerationExecutor),
}

impl BuiltinExecutor {
  pub fn kind(&self) -> &'static str {
    match self {
      BuiltinExecutor::Compute(_) => "compute",
      BuiltinExecutor::Http(_) => "http",
      BuiltinExecutor::TextGeneration(_) => "text_generation",
    }
  }
}

/// Routes to the wrapped executor.
#[async_trait]
impl TaskExecutor for BuiltinExecutor {
  async fn execute(&self, ctx: &TaskContext) -> Result<serde_json::Value, TaskError> {
    match self {
      BuiltinExecutor::Compute(executor) => executor.execute(ctx).await,
      BuiltinExecutor::Http(executor) => executor.execute(ctx).await,
      BuiltinExecutor::TextGeneration(executor) => executor.execute(ctx).await,
    }
  }
}
