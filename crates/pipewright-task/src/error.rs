use thiserror::Error;

/// Errors that can occur inside a task executor.
#[derive(Debug, Error)]
pub enum TaskError {
  /// Missing required input field.
  #[error("missing required input: {field}")]
  MissingInput { field: String },

  /// Invalid input value.
  #[error("invalid input '{field}': {message}")]
  InvalidInput { field: String, message: String },

  /// The task descriptor or executor is misconfigured.
  #[error("invalid configuration: {message}")]
  Configuration { message: String },

  /// HTTP request failed before a response was received.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The remote side answered with a non-success status.
  #[error("{url} returned status {status}")]
  Status { status: u16, url: String },

  /// The remote response could not be decoded.
  #[error("invalid output: {message}")]
  InvalidOutput { message: String },

  /// A prompt template failed to render.
  #[error("template error: {message}")]
  Template { message: String },
}
