use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::results::ApiResult;

/// A function invocation requested by the model during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub function: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, function: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            function: function.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Execution,
    Timeout,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Execution => "execution",
            FailureKind::Timeout => "timeout",
        }
    }
}

/// Failure descriptor handed back to the model in place of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutput {
    Success { result: ApiResult },
    Failure { failure: ToolFailure },
}

impl ToolOutput {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutput::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call_id: String,
    pub function: String,
    pub output: ToolOutput,
}

impl ToolCallResult {
    pub fn success(request: &ToolCallRequest, result: ApiResult) -> Self {
        Self {
            call_id: request.id.clone(),
            function: request.function.clone(),
            output: ToolOutput::Success { result },
        }
    }

    pub fn failure(request: &ToolCallRequest, failure: ToolFailure) -> Self {
        Self {
            call_id: request.id.clone(),
            function: request.function.clone(),
            output: ToolOutput::Failure { failure },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnKind {
    UserMessage { text: String },
    AssistantMessage { text: String },
    ToolCallRequest(ToolCallRequest),
    ToolCallResult(ToolCallResult),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TurnKind,
}

impl Turn {
    pub fn tool_call_id(&self) -> Option<&str> {
        match &self.kind {
            TurnKind::ToolCallRequest(request) => Some(request.id.as_str()),
            TurnKind::ToolCallResult(result) => Some(result.call_id.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
}

/// Bookkeeping for one user command; only its terminal status and error outlive it.
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    pub id: String,
    pub session_id: String,
    pub status: RunStatus,
    pub last_error: Option<String>,
    pub round_trips: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn start(session_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            status: RunStatus::InProgress,
            last_error: None,
            round_trips: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.last_error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::InProgress
    }
}
