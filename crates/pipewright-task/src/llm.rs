//! Remote text-generation tasks.
//!
//! The task's `prompt` is a minijinja template rendered against its input.
//! When the input is a JSON object its fields are top-level template
//! variables; the whole input is also available as `input`.

use async_trait::async_trait;
use minijinja::Environment;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::TaskError;
use crate::executor::TaskExecutor;
use crate::types::{TaskContext, TaskInput};

const DEFAULT_PROMPT: &str = "Write a poem about {{ title }}";

/// Connection settings for the text-generation backend.
#[derive(Debug, Clone)]
pub struct TextGenerationConfig {
  /// Bearer token. Tasks fail with a configuration error when unset.
  pub api_key: Option<String>,
  /// Base URL of the chat API; `/v2/chat` is appended.
  pub base_url: String,
  /// Model used when a task does not name one.
  pub model: String,
}

impl Default for TextGenerationConfig {
  fn default() -> Self {
    Self {
      api_key: None,
      base_url: "https://api.cohere.com".to_string(),
      model: "command-a-03-2025".to_string(),
    }
  }
}

/// Type-specific configuration of a text-generation task.
#[derive(Debug, Deserialize)]
struct PromptConfig {
  #[serde(default)]
  prompt: Option<String>,
  #[serde(default)]
  model: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
  #[serde(default)]
  content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(default)]
  text: Option<String>,
}

/// Sends a rendered prompt to a chat-style generation API and returns the
/// generated text as a JSON string.
#[derive(Debug, Clone)]
pub struct TextGenerationExecutor {
  client: Client,
  config: TextGenerationConfig,
}

impl TextGenerationExecutor {
  pub fn new(config: TextGenerationConfig) -> Self {
    Self::with_client(Client::new(), config)
  }

  pub fn with_client(client: Client, config: TextGenerationConfig) -> Self {
    Self { client, config }
  }

  pub fn config(&self) -> &TextGenerationConfig {
    &self.config
  }
}

#[async_trait]
impl TaskExecutor for TextGenerationExecutor {
  async fn execute(&self, ctx: &TaskContext) -> Result<Value, TaskError> {
    let prompt_config: PromptConfig = ctx.config()?;

    let api_key = self
      .config
      .api_key
      .as_deref()
      .ok_or_else(|| TaskError::Configuration {
        message: "text generation requires an API key".to_string(),
      })?;

    let input = prompt_input(&ctx.input)?;
    let template = prompt_config.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);
    let prompt = render_prompt(template, input)?;
    let model = prompt_config.model.as_deref().unwrap_or(&self.config.model);

    let url = format!("{}/v2/chat", self.config.base_url.trim_end_matches('/'));
    let body = ChatRequest {
      model,
      messages: vec![ChatMessage {
        role: "user",
        content: &prompt,
      }],
    };

    debug!(task_id = %ctx.task.id, model = %model, url = %url, "requesting generation");
    let response = self
      .client
      .post(&url)
      .bearer_auth(api_key)
      .json(&body)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(TaskError::Status {
        status: status.as_u16(),
        url,
      });
    }

    let chat: ChatResponse = response
      .json()
      .await
      .map_err(|e| TaskError::InvalidOutput {
        message: format!("unexpected chat response: {}", e),
      })?;

    chat
      .message
      .content
      .into_iter()
      .find_map(|block| block.text)
      .map(Value::String)
      .ok_or_else(|| TaskError::InvalidOutput {
        message: "chat response contained no text".to_string(),
      })
  }
}

/// The value the prompt is rendered against.
fn prompt_input(input: &TaskInput) -> Result<Value, TaskError> {
  let value = input.value();
  if value.is_null() {
    let field = match input {
      TaskInput::Upstream { task_id, .. } => task_id.clone(),
      TaskInput::Params(_) => "inputs".to_string(),
    };
    return Err(TaskError::MissingInput { field });
  }
  Ok(value)
}

fn render_prompt(template: &str, input: Value) -> Result<String, TaskError> {
  let mut vars = match &input {
    Value::Object(fields) => fields.clone(),
    _ => serde_json::Map::new(),
  };
  vars.insert("input".to_string(), input);

  Environment::new()
    .render_str(template, Value::Object(vars))
    .map_err(|e| TaskError::Template {
      message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Lookup;
  use serde_json::json;

  #[test]
  fn test_render_default_prompt_from_object() {
    let prompt = render_prompt(DEFAULT_PROMPT, json!({ "title": "Essence Mascara" })).unwrap();
    assert_eq!(prompt, "Write a poem about Essence Mascara");
  }

  #[test]
  fn test_render_scalar_input() {
    let prompt = render_prompt("Describe {{ input }}", json!("rain")).unwrap();
    assert_eq!(prompt, "Describe rain");
  }

  #[test]
  fn test_render_invalid_template() {
    let err = render_prompt("{{ title ", json!({})).unwrap_err();
    assert!(matches!(err, TaskError::Template { .. }));
  }

  #[test]
  fn test_missing_upstream_is_an_error() {
    let input = TaskInput::Upstream {
      task_id: "task2".to_string(),
      lookup: Lookup::Pending,
    };
    let err = prompt_input(&input).unwrap_err();
    assert!(matches!(err, TaskError::MissingInput { ref field } if field == "task2"));
  }
}
