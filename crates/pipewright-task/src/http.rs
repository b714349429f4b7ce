//! Remote HTTP call tasks.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::TaskError;
use crate::executor::TaskExecutor;
use crate::types::{TaskContext, TaskInput};

/// Type-specific configuration of an HTTP task.
#[derive(Debug, Deserialize)]
struct HttpConfig {
  endpoint: String,
  #[serde(default = "default_method")]
  method: String,
  #[serde(default)]
  headers: HashMap<String, String>,
  /// Array field of the response whose first element becomes the output
  /// when no record id was appended to the endpoint.
  #[serde(default)]
  pick: Option<String>,
}

fn default_method() -> String {
  "GET".to_string()
}

/// Calls an HTTP endpoint and decodes the JSON response.
///
/// When the task references another task whose output is a positive integer
/// (or a string holding one), that value is appended to the endpoint as a
/// record id and the decoded document is returned as-is. Otherwise scalar
/// parameters are sent as the query string, and `pick` may select the first
/// element of an array field.
#[derive(Debug, Clone, Default)]
pub struct HttpExecutor {
  client: Client,
}

impl HttpExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  /// Use a preconfigured client (timeouts, proxies, default headers).
  pub fn with_client(client: Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl TaskExecutor for HttpExecutor {
  async fn execute(&self, ctx: &TaskContext) -> Result<Value, TaskError> {
    let config: HttpConfig = ctx.config()?;
    let method = parse_method(&config.method)?;

    let record_id = ctx.input.upstream().and_then(record_id);
    let url = match record_id {
      Some(id) => format!("{}/{}", config.endpoint.trim_end_matches('/'), id),
      None => config.endpoint.clone(),
    };

    let mut request = self.client.request(method, &url);
    for (key, value) in &config.headers {
      request = request.header(key, value);
    }
    if let TaskInput::Params(params) = &ctx.input {
      let query = query_pairs(params);
      if !query.is_empty() {
        request = request.query(&query);
      }
    }

    debug!(task_id = %ctx.task.id, method = %config.method, url = %url, "sending request");
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
      return Err(TaskError::Status {
        status: status.as_u16(),
        url,
      });
    }

    let body = response.text().await?;
    let data: Value = serde_json::from_str(&body).map_err(|e| TaskError::InvalidOutput {
      message: format!("response from {} is not JSON: {}", url, e),
    })?;

    if record_id.is_some() {
      return Ok(data);
    }

    Ok(match config.pick.as_deref() {
      Some(field) => pick_first(&data, field).unwrap_or(data),
      None => data,
    })
  }
}

/// A positive integer id carried by an upstream output.
fn record_id(value: &Value) -> Option<u64> {
  let id = match value {
    Value::Number(n) => n.as_u64().or_else(|| {
      n.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= u64::MAX as f64)
        .map(|f| f as u64)
    }),
    Value::String(s) => s.trim().parse::<u64>().ok(),
    _ => None,
  }?;
  (id > 0).then_some(id)
}

fn pick_first(data: &Value, field: &str) -> Option<Value> {
  data.get(field)?.as_array()?.first().cloned()
}

fn query_pairs(params: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
  params
    .iter()
    .filter_map(|(key, value)| {
      let rendered = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
      };
      Some((key.clone(), rendered))
    })
    .collect()
}

fn parse_method(method: &str) -> Result<Method, TaskError> {
  match method.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    "HEAD" => Ok(Method::HEAD),
    "OPTIONS" => Ok(Method::OPTIONS),
    _ => Err(TaskError::InvalidInput {
      field: "method".to_string(),
      message: format!("unsupported HTTP method: {}", method),
    }),
  }
}
