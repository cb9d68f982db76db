//! Model types - Request, Response, and Error types

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::application::session::History;
use crate::application::tooling::FunctionSpec;
use crate::domain::ToolCallRequest;

/// Everything the model sees for one step of a run.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub instructions: Option<String>,
    pub history: History,
    pub tools: Vec<FunctionSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Final(String),
    ToolCalls(Vec<ToolCallRequest>),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider '{provider}' requires an API key")]
    MissingApiKey { provider: String },
    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' answered with HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("provider '{provider}' returned invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
    #[error("model call timed out after {}s", after.as_secs())]
    Timeout { after: Duration },
}

impl ModelError {
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Rate limits, server errors and connection failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Network { source, .. } => source.is_connect() || source.is_timeout(),
            ModelError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ModelError::MissingApiKey { provider } => {
                format!("Model provider '{provider}' needs an API key. Check your environment.")
            }
            ModelError::Network { provider, source } => {
                if source.is_connect() {
                    format!("Could not reach model provider '{provider}'.")
                } else if source.is_timeout() {
                    format!("Request to '{provider}' timed out.")
                } else {
                    format!("Network error while talking to '{provider}'.")
                }
            }
            ModelError::Status {
                provider, status, ..
            } => match StatusCode::from_u16(*status).ok() {
                Some(StatusCode::TOO_MANY_REQUESTS) => {
                    format!("Model provider '{provider}' is rate limiting requests. Try again shortly.")
                }
                Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN) => {
                    format!("Model provider '{provider}' rejected the credentials.")
                }
                Some(StatusCode::NOT_FOUND) => {
                    format!("Model endpoint for '{provider}' was not found. Check the deployment name.")
                }
                _ => format!("Model provider '{provider}' failed with status {status}."),
            },
            ModelError::InvalidResponse { provider, .. } => {
                format!("Model provider '{provider}' returned a response that could not be understood.")
            }
            ModelError::Timeout { after } => {
                format!("The model did not answer within {}s.", after.as_secs())
            }
        }
    }
}
