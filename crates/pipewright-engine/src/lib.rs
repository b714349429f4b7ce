//! Pipewright Engine
//!
//! This crate runs pipelines: flat, caller-ordered lists of heterogeneous
//! tasks where each task records a named output later tasks may consume.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Pipeline                            │
//! │  - run(tasks, sink) → RunResult | PipelineError             │
//! │  - sequential or parallel scheduling                        │
//! │  - emits the final "done" event                             │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TaskRunner                           │
//! │  - resolves inputs from the ContextStore                    │
//! │  - dispatches through the ExecutorRegistry                  │
//! │  - records output, emits "completed" / "failed"             │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TaskExecutor (per type)                   │
//! │  - compute, HTTP, text generation, or caller-supplied       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use pipewright_engine::{ExecutorRegistry, NoopSink, Pipeline, PipelineConfig};
//! use pipewright_task::TextGenerationConfig;
//!
//! let registry = ExecutorRegistry::with_builtins(TextGenerationConfig::default());
//! let pipeline = Pipeline::new(registry, PipelineConfig::sequential());
//! let result = pipeline.run(&tasks, Arc::new(NoopSink)).await?;
//! println!("{:?}", result.outputs);
//! ```

mod context;
mod error;
mod events;
mod pipeline;
mod registry;
mod runner;

pub use context::{ContextSnapshot, ContextStore};
pub use error::{EngineError, PipelineError};
pub use events::{ChannelSink, NoopSink, PIPELINE_ID, PipelineEvent, StatusSink, TaskStatus};
pub use pipeline::{Pipeline, PipelineConfig, RunResult};
pub use registry::{COMPUTE_TYPES, ExecutorRegistry, HTTP_TYPES, TEXT_GENERATION_TYPES};
pub use runner::TaskRunner;

pub use pipewright_config::{ExecutionMode, TaskDef, TaskInputs};
pub use pipewright_task::{Lookup, TaskContext, TaskError, TaskExecutor, TaskInput};
