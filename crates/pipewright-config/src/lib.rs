//! Pipewright Config
//!
//! This crate contains the serializable pipeline configuration types for
//! pipewright. A pipeline is a flat, caller-ordered list of task descriptors;
//! there is no dependency graph. A task may consume the output of another task
//! by naming its id as its `inputs`.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `pipewright run pipeline.json`)
//! - Values built in code (tests, embedding applications)

mod enums;
mod input;
mod pipeline;
mod task;

pub use enums::ExecutionMode;
pub use input::TaskInputs;
pub use pipeline::PipelineDef;
pub use task::TaskDef;
