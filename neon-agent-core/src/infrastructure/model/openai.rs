//! OpenAI-compatible chat-completions client with native tool calling
//! (OpenAI, Azure OpenAI deployments, and compatible gateways).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::ModelProvider;
use super::types::{ModelError, ModelRequest, ModelResponse};
use crate::application::formatter;
use crate::application::session::History;
use crate::application::tooling::FunctionSpec;
use crate::config::ProviderConfig;
use crate::domain::{ToolCallRequest, ToolOutput, TurnKind};

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    #[default]
    Bearer,
    /// `api-key: <key>` as used by Azure OpenAI
    ApiKey,
}

/// Retry strategy for a single model call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first (at least 1).
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    id: String,
    http: Client,
    endpoint: String,
    api_path: String,
    api_key: Option<String>,
    auth: AuthScheme,
    retry: RetryPolicy,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            http: Client::new(),
            endpoint: endpoint.into(),
            api_path: "/v1/chat/completions".to_string(),
            api_key: None,
            auth: AuthScheme::Bearer,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &ProviderConfig, api_key: Option<String>) -> Self {
        Self::new(config.id.clone(), config.endpoint.clone())
            .with_api_path(config.api_path.clone())
            .with_api_key(api_key)
            .with_auth(config.auth)
            .with_retry(RetryPolicy {
                max_attempts: config.max_attempts.max(1),
                initial_backoff: Duration::from_millis(config.initial_backoff_ms),
                ..RetryPolicy::default()
            })
    }

    pub fn with_api_path(mut self, api_path: impl Into<String>) -> Self {
        self.api_path = api_path.into();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    fn build_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = self.api_path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn require_api_key(&self) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ModelError::missing_api_key(&self.id))
    }

    async fn send_once(&self, url: &str, payload: &Value) -> Result<ChatCompletion, ModelError> {
        let api_key = self.require_api_key()?;
        let builder = self.http.post(url).json(payload);
        let builder = match self.auth {
            AuthScheme::Bearer => builder.bearer_auth(api_key),
            AuthScheme::ApiKey => builder.header("api-key", api_key),
        };

        let response = builder
            .send()
            .await
            .map_err(|err| ModelError::network(&self.id, err))?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > ERROR_BODY_LIMIT {
                let cut = (0..=ERROR_BODY_LIMIT)
                    .rev()
                    .find(|idx| body.is_char_boundary(*idx))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(ModelError::Status {
                provider: self.id.clone(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|err| ModelError::invalid_response(&self.id, err.to_string()))
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.build_url();
        let payload = build_payload(&request);
        info!(
            provider = self.id.as_str(),
            model = request.model.as_str(),
            turns = request.history.len(),
            tools = request.tools.len(),
            "Sending request to model provider"
        );

        let mut attempt = 1;
        let completion = loop {
            match self.send_once(&url, &payload).await {
                Ok(completion) => break completion,
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        provider = self.id.as_str(),
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };
        debug!(provider = self.id.as_str(), "Received response from model provider");

        parse_completion(&self.id, completion)
    }
}

fn build_payload(request: &ModelRequest) -> Value {
    let mut payload = json!({
        "model": request.model,
        "messages": to_messages(request.instructions.as_deref(), &request.history),
    });
    if !request.tools.is_empty() {
        let tools: Vec<Value> = request.tools.iter().map(tool_definition).collect();
        payload["tools"] = Value::Array(tools);
        payload["tool_choice"] = json!("auto");
    }
    payload
}

fn tool_definition(spec: &FunctionSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": spec.parameters_schema(),
        }
    })
}

/// Consecutive tool-call request turns fold into one assistant message, the
/// way the chat-completions API emitted them.
fn to_messages(instructions: Option<&str>, history: &History) -> Vec<Value> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(instructions) = instructions.filter(|text| !text.trim().is_empty()) {
        messages.push(json!({"role": "system", "content": instructions}));
    }

    let mut pending_calls: Vec<Value> = Vec::new();
    for turn in history {
        if let TurnKind::ToolCallRequest(request) = &turn.kind {
            pending_calls.push(json!({
                "id": request.id,
                "type": "function",
                "function": {
                    "name": request.function,
                    "arguments": arguments_text(&request.arguments),
                }
            }));
            continue;
        }
        flush_tool_calls(&mut messages, &mut pending_calls);

        match &turn.kind {
            TurnKind::UserMessage { text } => {
                messages.push(json!({"role": "user", "content": text}));
            }
            TurnKind::AssistantMessage { text } => {
                messages.push(json!({"role": "assistant", "content": text}));
            }
            TurnKind::ToolCallResult(result) => {
                let content = match &result.output {
                    ToolOutput::Success { result } => json!({
                        "success": true,
                        "output": result.payload(),
                        "message": formatter::format(result),
                    }),
                    ToolOutput::Failure { failure } => json!({
                        "success": false,
                        "error": failure,
                    }),
                };
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": result.call_id,
                    "content": content.to_string(),
                }));
            }
            TurnKind::ToolCallRequest(_) => {}
        }
    }
    flush_tool_calls(&mut messages, &mut pending_calls);
    messages
}

fn flush_tool_calls(messages: &mut Vec<Value>, pending: &mut Vec<Value>) {
    if pending.is_empty() {
        return;
    }
    messages.push(json!({
        "role": "assistant",
        "content": Value::Null,
        "tool_calls": std::mem::take(pending),
    }));
}

fn arguments_text(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    }
}

fn parse_completion(provider: &str, completion: ChatCompletion) -> Result<ModelResponse, ModelError> {
    let message = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .ok_or_else(|| ModelError::invalid_response(provider, "missing message"))?;

    if !message.tool_calls.is_empty() {
        let calls = message
            .tool_calls
            .into_iter()
            .map(|call| {
                let raw = call.function.arguments;
                // Unparseable arguments are passed through so validation reports them to the model.
                let arguments = if raw.trim().is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
                };
                ToolCallRequest::new(call.id, call.function.name, arguments)
            })
            .collect();
        return Ok(ModelResponse::ToolCalls(calls));
    }

    match message.content {
        Some(content) if !content.trim().is_empty() => Ok(ModelResponse::Final(content)),
        _ => Err(ModelError::invalid_response(
            provider,
            "response has neither content nor tool calls",
        )),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<AssistantMessage>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}
