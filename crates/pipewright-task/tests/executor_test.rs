//! Integration tests for the HTTP and text-generation executors against a
//! local mock server.

use httpmock::prelude::*;
use pipewright_config::{TaskDef, TaskInputs};
use pipewright_task::{
  HttpExecutor, Lookup, TaskContext, TaskError, TaskExecutor, TaskInput, TextGenerationConfig,
  TextGenerationExecutor,
};
use serde_json::{Value, json};

fn client() -> reqwest::Client {
  reqwest::Client::builder()
    .no_proxy()
    .build()
    .expect("failed to build client")
}

fn upstream(task_id: &str, value: Value) -> TaskInput {
  TaskInput::Upstream {
    task_id: task_id.to_string(),
    lookup: Lookup::Ready(value),
  }
}

fn params(value: Value) -> TaskInput {
  TaskInput::Params(value.as_object().cloned().unwrap())
}

fn api_task(endpoint: &str) -> TaskDef {
  TaskDef::new("t2", "api", "t1").with("endpoint", endpoint)
}

fn generation_config(server: &MockServer) -> TextGenerationConfig {
  TextGenerationConfig {
    api_key: Some("secret".to_string()),
    base_url: server.base_url(),
    ..TextGenerationConfig::default()
  }
}

#[tokio::test]
async fn test_http_appends_record_id() {
  let server = MockServer::start_async().await;
  let mock = server
    .mock_async(|when, then| {
      when.method(GET).path("/products/20");
      then
        .status(200)
        .json_body(json!({ "id": 20, "title": "Lamp" }));
    })
    .await;

  let task = api_task(&server.url("/products"));
  let ctx = TaskContext::new("run", task, upstream("t1", json!(20)));

  let output = HttpExecutor::with_client(client())
    .execute(&ctx)
    .await
    .unwrap();

  assert_eq!(output, json!({ "id": 20, "title": "Lamp" }));
  mock.assert_async().await;
}

#[tokio::test]
async fn test_http_numeric_string_is_a_record_id() {
  let server = MockServer::start_async().await;
  let mock = server
    .mock_async(|when, then| {
      when.method(GET).path("/products/7");
      then.status(200).json_body(json!({ "id": 7 }));
    })
    .await;

  let task = api_task(&server.url("/products/"));
  let ctx = TaskContext::new("run", task, upstream("t1", json!("7")));

  let output = HttpExecutor::with_client(client())
    .execute(&ctx)
    .await
    .unwrap();

  assert_eq!(output, json!({ "id": 7 }));
  mock.assert_async().await;
}

#[tokio::test]
async fn test_http_picks_first_element_without_record_id() {
  let server = MockServer::start_async().await;
  let mock = server
    .mock_async(|when, then| {
      when
        .method(GET)
        .path("/products")
        .query_param("limit", "2");
      then
        .status(200)
        .json_body(json!({ "products": [{ "id": 1 }, { "id": 2 }], "total": 2 }));
    })
    .await;

  let task = TaskDef::new("t2", "api", TaskInputs::default())
    .with("endpoint", server.url("/products"))
    .with("pick", "products");
  let ctx = TaskContext::new("run", task, params(json!({ "limit": 2 })));

  let output = HttpExecutor::with_client(client())
    .execute(&ctx)
    .await
    .unwrap();

  assert_eq!(output, json!({ "id": 1 }));
  mock.assert_async().await;
}

#[tokio::test]
async fn test_http_pick_falls_back_to_whole_document() {
  let server = MockServer::start_async().await;
  server
    .mock_async(|when, then| {
      when.method(GET).path("/products");
      then.status(200).json_body(json!({ "products": [], "total": 0 }));
    })
    .await;

  let task = TaskDef::new("t2", "api", TaskInputs::default())
    .with("endpoint", server.url("/products"))
    .with("pick", "products");
  let ctx = TaskContext::new("run", task, params(json!({})));

  let output = HttpExecutor::with_client(client())
    .execute(&ctx)
    .await
    .unwrap();

  assert_eq!(output, json!({ "products": [], "total": 0 }));
}

#[tokio::test]
async fn test_http_pending_upstream_calls_bare_endpoint() {
  let server = MockServer::start_async().await;
  let mock = server
    .mock_async(|when, then| {
      when.method(POST).path("/products");
      then.status(200).json_body(json!({ "ok": true }));
    })
    .await;

  let task = api_task(&server.url("/products")).with("method", "post");
  let ctx = TaskContext::new(
    "run",
    task,
    TaskInput::Upstream {
      task_id: "t1".to_string(),
      lookup: Lookup::Pending,
    },
  );

  let output = HttpExecutor::with_client(client())
    .execute(&ctx)
    .await
    .unwrap();

  assert_eq!(output, json!({ "ok": true }));
  mock.assert_async().await;
}

#[tokio::test]
async fn test_http_error_status_fails() {
  let server = MockServer::start_async().await;
  server
    .mock_async(|when, then| {
      when.method(GET).path("/products/20");
      then.status(500).body("Internal Server Error");
    })
    .await;

  let task = api_task(&server.url("/products"));
  let ctx = TaskContext::new("run", task, upstream("t1", json!(20)));

  let err = HttpExecutor::with_client(client())
    .execute(&ctx)
    .await
    .unwrap_err();

  match err {
    TaskError::Status { status, url } => {
      assert_eq!(status, 500);
      assert!(url.ends_with("/products/20"));
    }
    other => panic!("expected status error, got {:?}", other),
  }
}

#[tokio::test]
async fn test_http_non_json_body_is_invalid_output() {
  let server = MockServer::start_async().await;
  server
    .mock_async(|when, then| {
      when.method(GET).path("/products/3");
      then.status(200).body("<html>not json</html>");
    })
    .await;

  let task = api_task(&server.url("/products"));
  let ctx = TaskContext::new("run", task, upstream("t1", json!(3)));

  let err = HttpExecutor::with_client(client())
    .execute(&ctx)
    .await
    .unwrap_err();
  assert!(matches!(err, TaskError::InvalidOutput { .. }));
}

#[tokio::test]
async fn test_http_missing_endpoint_is_configuration_error() {
  let task = TaskDef::new("t2", "api", "t1");
  let ctx = TaskContext::new("run", task, upstream("t1", json!(1)));

  let err = HttpExecutor::new().execute(&ctx).await.unwrap_err();
  assert!(matches!(err, TaskError::Configuration { .. }));
}

#[tokio::test]
async fn test_text_generation_renders_prompt_and_returns_text() {
  let server = MockServer::start_async().await;
  let mock = server
    .mock_async(|when, then| {
      when
        .method(POST)
        .path("/v2/chat")
        .header("Authorization", "Bearer secret")
        .json_body(json!({
          "model": "command-a-03-2025",
          "messages": [{ "role": "user", "content": "Write a poem about Lamp" }]
        }));
      then.status(200).json_body(json!({
        "id": "gen-1",
        "message": {
          "role": "assistant",
          "content": [{ "type": "text", "text": "A lamp glows softly." }]
        }
      }));
    })
    .await;

  let task = TaskDef::new("t3", "llm", "t2");
  let ctx = TaskContext::new("run", task, upstream("t2", json!({ "title": "Lamp" })));

  let output = TextGenerationExecutor::with_client(client(), generation_config(&server))
    .execute(&ctx)
    .await
    .unwrap();

  assert_eq!(output, json!("A lamp glows softly."));
  mock.assert_async().await;
}

#[tokio::test]
async fn test_text_generation_task_overrides_prompt_and_model() {
  let server = MockServer::start_async().await;
  let mock = server
    .mock_async(|when, then| {
      when.method(POST).path("/v2/chat").json_body(json!({
        "model": "tiny-model",
        "messages": [{ "role": "user", "content": "Summarize the news" }]
      }));
      then
        .status(200)
        .json_body(json!({ "message": { "content": [{ "text": "ok" }] } }));
    })
    .await;

  let task = TaskDef::new("t3", "llm", "t2")
    .with("prompt", "Summarize {{ input }}")
    .with("model", "tiny-model");
  let ctx = TaskContext::new("run", task, upstream("t2", json!("the news")));

  let output = TextGenerationExecutor::with_client(client(), generation_config(&server))
    .execute(&ctx)
    .await
    .unwrap();

  assert_eq!(output, json!("ok"));
  mock.assert_async().await;
}

#[tokio::test]
async fn test_text_generation_remote_failure_is_reported() {
  let server = MockServer::start_async().await;
  server
    .mock_async(|when, then| {
      when.method(POST).path("/v2/chat");
      then.status(429).json_body(json!({ "message": "slow down" }));
    })
    .await;

  let task = TaskDef::new("t3", "llm", "t2");
  let ctx = TaskContext::new("run", task, upstream("t2", json!({ "title": "Lamp" })));

  let err = TextGenerationExecutor::with_client(client(), generation_config(&server))
    .execute(&ctx)
    .await
    .unwrap_err();
  assert!(matches!(err, TaskError::Status { status: 429, .. }));
}

#[tokio::test]
async fn test_text_generation_requires_api_key() {
  let task = TaskDef::new("t3", "llm", "t2");
  let ctx = TaskContext::new("run", task, upstream("t2", json!({ "title": "Lamp" })));

  let err = TextGenerationExecutor::new(TextGenerationConfig::default())
    .execute(&ctx)
    .await
    .unwrap_err();
  assert!(matches!(err, TaskError::Configuration { .. }));
}
