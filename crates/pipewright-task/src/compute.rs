//! Local computation tasks.
//!
//! A compute task names a function in its `function` field. The function
//! receives the task's parameter bundle, or the upstream output when the task
//! references another task and that output is a JSON object.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::TaskError;
use crate::executor::TaskExecutor;
use crate::types::TaskContext;

/// A named local function.
pub type ComputeFn = Arc<dyn Fn(&Map<String, Value>) -> Result<Value, TaskError> + Send + Sync>;

/// Runs named local functions. `add` and `multiply` are built in.
#[derive(Clone)]
pub struct ComputeExecutor {
  functions: HashMap<String, ComputeFn>,
}

impl ComputeExecutor {
  pub fn new() -> Self {
    Self::empty()
      .with_function("add", |params| {
        arithmetic(params, "add", i64::checked_add, |a, b| a + b)
      })
      .with_function("multiply", |params| {
        arithmetic(params, "multiply", i64::checked_mul, |a, b| a * b)
      })
  }

  /// An executor with no functions registered.
  pub fn empty() -> Self {
    Self {
      functions: HashMap::new(),
    }
  }

  /// Register a function, replacing any existing one with the same name.
  pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
  where
    F: Fn(&Map<String, Value>) -> Result<Value, TaskError> + Send + Sync + 'static,
  {
    self.functions.insert(name.into(), Arc::new(function));
    self
  }

  /// Names of registered functions, sorted.
  pub fn functions(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  /// Call a function directly.
  pub fn call(&self, name: &str, params: &Map<String, Value>) -> Result<Value, TaskError> {
    let function = self
      .functions
      .get(name)
      .ok_or_else(|| TaskError::InvalidInput {
        field: "function".to_string(),
        message: format!("unknown function '{}'", name),
      })?;
    function(params)
  }
}

impl Default for ComputeExecutor {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl TaskExecutor for ComputeExecutor {
  async fn execute(&self, ctx: &TaskContext) -> Result<Value, TaskError> {
    let name = ctx
      .task
      .config_str("function")
      .ok_or_else(|| TaskError::MissingInput {
        field: "function".to_string(),
      })?;

    let params = ctx.input.params().ok_or_else(|| TaskError::InvalidInput {
      field: "inputs".to_string(),
      message: "expected a parameter object".to_string(),
    })?;

    debug!(task_id = %ctx.task.id, function = %name, "calling compute function");
    self.call(name, params)
  }
}

fn arithmetic(
  params: &Map<String, Value>,
  op: &str,
  int_op: fn(i64, i64) -> Option<i64>,
  float_op: fn(f64, f64) -> f64,
) -> Result<Value, TaskError> {
  let x = operand(params, "x")?;
  let y = operand(params, "y")?;

  if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
    return int_op(a, b)
      .map(Value::from)
      .ok_or_else(|| TaskError::InvalidInput {
        field: "x".to_string(),
        message: format!("{} of {} and {} overflows", op, a, b),
      });
  }

  let (a, b) = match (x.as_f64(), y.as_f64()) {
    (Some(a), Some(b)) => (a, b),
    _ => {
      return Err(TaskError::InvalidInput {
        field: "x".to_string(),
        message: format!("operands {} and {} are not representable", x, y),
      });
    }
  };

  Number::from_f64(float_op(a, b))
    .map(Value::Number)
    .ok_or_else(|| TaskError::InvalidInput {
      field: "x".to_string(),
      message: format!("{} of {} and {} is not finite", op, a, b),
    })
}

fn operand<'a>(params: &'a Map<String, Value>, field: &str) -> Result<&'a Number, TaskError> {
  match params.get(field) {
    None | Some(Value::Null) => Err(TaskError::MissingInput {
      field: field.to_string(),
    }),
    Some(Value::Number(n)) => Ok(n),
    Some(other) => Err(TaskError::InvalidInput {
      field: field.to_string(),
      message: format!("expected a number, got {}", other),
    }),
  }
}
