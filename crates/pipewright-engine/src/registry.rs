//! Executor registry.
//!
//! Maps a task's `type` tag to the executor that runs it. Registration happens
//! at setup time; during a run the registry is shared read-only.

use std::collections::HashMap;
use std::sync::Arc;

use pipewright_task::{
  BuiltinExecutor, ComputeExecutor, HttpExecutor, TaskExecutor, TextGenerationConfig,
  TextGenerationExecutor,
};

use crate::error::EngineError;

/// Task type tags the built-in executors are registered under.
pub const COMPUTE_TYPES: [&str; 2] = ["python", "compute"];
pub const HTTP_TYPES: [&str; 2] = ["api", "http"];
pub const TEXT_GENERATION_TYPES: [&str; 1] = ["llm"];

#[derive(Clone, Default)]
pub struct ExecutorRegistry {
  executors: HashMap<String, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with the compute, HTTP and text-generation executors.
  pub fn with_builtins(text_generation: TextGenerationConfig) -> Self {
    let mut registry = Self::new();
    registry.register_builtin(&COMPUTE_TYPES, BuiltinExecutor::Compute(ComputeExecutor::new()));
    registry.register_builtin(&HTTP_TYPES, BuiltinExecutor::Http(HttpExecutor::new()));
    registry.register_builtin(
      &TEXT_GENERATION_TYPES,
      BuiltinExecutor::TextGeneration(TextGenerationExecutor::new(text_generation)),
    );
    registry
  }

  /// Register a built-in executor under several tags, sharing one instance.
  pub fn register_builtin(&mut self, task_types: &[&str], executor: BuiltinExecutor) {
    let executor: Arc<dyn TaskExecutor> = Arc::new(executor);
    for task_type in task_types {
      self.register_shared(*task_type, executor.clone());
    }
  }

  /// Register an executor for a tag.
  ///
  /// Replaces any executor already registered for the tag and returns
  /// whether one was.
  pub fn register<E>(&mut self, task_type: impl Into<String>, executor: E) -> bool
  where
    E: TaskExecutor + 'static,
  {
    self.register_shared(task_type, Arc::new(executor))
  }

  /// Register an already shared executor for a tag.
  pub fn register_shared(
    &mut self,
    task_type: impl Into<String>,
    executor: Arc<dyn TaskExecutor>,
  ) -> bool {
    self.executors.insert(task_type.into(), executor).is_some()
  }

  pub fn lookup(&self, task_type: &str) -> Result<Arc<dyn TaskExecutor>, EngineError> {
    self
      .executors
      .get(task_type)
      .cloned()
      .ok_or_else(|| EngineError::UnknownTaskType {
        task_type: task_type.to_string(),
      })
  }

  pub fn contains(&self, task_type: &str) -> bool {
    self.executors.contains_key(task_type)
  }

  /// Registered tags, sorted.
  pub fn registered_types(&self) -> Vec<String> {
    let mut types: Vec<String> = self.executors.keys().cloned().collect();
    types.sort();
    types
  }
}
