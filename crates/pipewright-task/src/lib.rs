//! Task execution for pipewright pipelines.
//!
//! This crate defines the [`TaskExecutor`] capability the engine dispatches
//! to, the [`TaskContext`] an executor receives, and the built-in executors:
//!
//! - [`ComputeExecutor`]: named local functions over a parameter bundle
//! - [`HttpExecutor`]: a remote HTTP call with JSON decoding
//! - [`TextGenerationExecutor`]: a remote chat-style text-generation call
//!
//! [`BuiltinExecutor`] is the closed set of those three, so a registry can be
//! populated from a tag without boxing each one separately.

mod compute;
mod error;
mod executor;
mod http;
mod llm;
mod types;

pub use compute::{ComputeExecutor, ComputeFn};
pub use error::TaskError;
pub use executor::{BuiltinExecutor, TaskExecutor};
pub use http::HttpExecutor;
pub use llm::{TextGenerationConfig, TextGenerationExecutor};
pub use types::{Lookup, TaskContext, TaskInput};
