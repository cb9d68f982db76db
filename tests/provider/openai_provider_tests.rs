// Provider tests - OpenAI-compatible client against a local fake
// chat-completions endpoint.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use neon_agent_core::domain::{ToolCallRequest, TurnKind};
use neon_agent_core::model::{
    AuthScheme, ModelError, ModelProvider, ModelRequest, ModelResponse, OpenAiCompatibleProvider,
    RetryPolicy,
};
use neon_agent_core::tooling::{FunctionSpec, ParamType, ParameterSpec};
use neon_agent_core::Session;
use serde_json::{Value, json};
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct FakeModel {
    bodies: Arc<Mutex<Vec<Value>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    hits: Arc<AtomicUsize>,
    fail_first: usize,
    fail_status: u16,
    reply: Value,
}

async fn completions(
    State(fake): State<FakeModel>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let hit = fake.hits.fetch_add(1, Ordering::SeqCst);
    fake.bodies.lock().await.push(body);
    fake.headers.lock().await.push(headers);
    if hit < fake.fail_first {
        let status = StatusCode::from_u16(fake.fail_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({"error": {"message": "try later"}})));
    }
    (StatusCode::OK, Json(fake.reply.clone()))
}

async fn start(fake: FakeModel) -> String {
    let router = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(fake);
    common::serve(router).await
}

fn final_reply(text: &str) -> Value {
    json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]})
}

fn request(tools: Vec<FunctionSpec>) -> ModelRequest {
    let session = Session::new();
    session.append(TurnKind::UserMessage {
        text: "create a project named demo".into(),
    });
    ModelRequest {
        model: "gpt-4o".into(),
        instructions: Some("You manage Neon projects.".into()),
        history: session.history(),
        tools,
    }
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
    }
}

#[tokio::test]
async fn final_answer_with_bearer_auth_and_tool_schema() {
    let fake = FakeModel {
        reply: final_reply("Nothing to do."),
        ..FakeModel::default()
    };
    let endpoint = start(fake.clone()).await;
    let provider = OpenAiCompatibleProvider::new("openai", endpoint).with_api_key(Some("sk-test".into()));
    let spec = FunctionSpec::new("create_project", "Create a Neon project")
        .param(ParameterSpec::required("project_name", ParamType::String));

    let response = provider.complete(request(vec![spec])).await.expect("completion");

    assert_eq!(response, ModelResponse::Final("Nothing to do.".into()));
    let headers = fake.headers.lock().await;
    assert_eq!(
        headers[0].get("authorization").and_then(|value| value.to_str().ok()),
        Some("Bearer sk-test")
    );
    let bodies = fake.bodies.lock().await;
    let body = &bodies[0];
    assert_eq!(body["model"], json!("gpt-4o"));
    assert_eq!(body["messages"][0]["role"], json!("system"));
    assert_eq!(body["messages"][1]["content"], json!("create a project named demo"));
    assert_eq!(body["tools"][0]["function"]["name"], json!("create_project"));
    assert_eq!(
        body["tools"][0]["function"]["parameters"]["required"],
        json!(["project_name"])
    );
}

#[tokio::test]
async fn tool_calls_are_parsed_and_bad_arguments_kept_raw() {
    let fake = FakeModel {
        reply: json!({"choices": [{"message": {
            "role": "assistant",
            "content": null,
            "tool_calls": [
                {"id": "call_a", "type": "function",
                 "function": {"name": "create_project", "arguments": "{\"project_name\":\"demo\"}"}},
                {"id": "call_b", "type": "function",
                 "function": {"name": "list_projects", "arguments": "{not json"}}
            ]
        }}]}),
        ..FakeModel::default()
    };
    let provider = OpenAiCompatibleProvider::new("openai", start(fake).await)
        .with_api_key(Some("sk-test".into()));

    let response = provider.complete(request(Vec::new())).await.expect("completion");

    assert_eq!(
        response,
        ModelResponse::ToolCalls(vec![
            ToolCallRequest::new("call_a", "create_project", json!({"project_name": "demo"})),
            ToolCallRequest::new("call_b", "list_projects", Value::String("{not json".into())),
        ])
    );
}

#[tokio::test]
async fn api_key_header_scheme() {
    let fake = FakeModel {
        reply: final_reply("ok"),
        ..FakeModel::default()
    };
    let provider = OpenAiCompatibleProvider::new("azure", start(fake.clone()).await)
        .with_api_key(Some("azure-key".into()))
        .with_auth(AuthScheme::ApiKey);

    provider.complete(request(Vec::new())).await.expect("completion");

    let headers = fake.headers.lock().await;
    assert_eq!(
        headers[0].get("api-key").and_then(|value| value.to_str().ok()),
        Some("azure-key")
    );
    assert!(headers[0].get("authorization").is_none());
}

#[tokio::test]
async fn server_errors_are_retried() {
    let fake = FakeModel {
        reply: final_reply("recovered"),
        fail_first: 1,
        fail_status: 503,
        ..FakeModel::default()
    };
    let provider = OpenAiCompatibleProvider::new("openai", start(fake.clone()).await)
        .with_api_key(Some("sk-test".into()))
        .with_retry(fast_retry(3));

    let response = provider.complete(request(Vec::new())).await.expect("retried");

    assert_eq!(response, ModelResponse::Final("recovered".into()));
    assert_eq!(fake.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let fake = FakeModel {
        reply: final_reply("never"),
        fail_first: usize::MAX,
        fail_status: 400,
        ..FakeModel::default()
    };
    let provider = OpenAiCompatibleProvider::new("openai", start(fake.clone()).await)
        .with_api_key(Some("sk-test".into()))
        .with_retry(fast_retry(3));

    let err = provider.complete(request(Vec::new())).await.expect_err("bad request");

    assert!(matches!(err, ModelError::Status { status: 400, .. }));
    assert_eq!(fake.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_key_fails_without_a_request() {
    let fake = FakeModel {
        reply: final_reply("never"),
        ..FakeModel::default()
    };
    let provider = OpenAiCompatibleProvider::new("openai", start(fake.clone()).await);

    let err = provider.complete(request(Vec::new())).await.expect_err("no key");

    assert!(matches!(err, ModelError::MissingApiKey { .. }));
    assert_eq!(fake.hits.load(Ordering::SeqCst), 0);
}
