use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, info};

use super::{ApiCall, BackendError, NeonApi};
use crate::config::NeonConfig;
use crate::domain::ApiResult;

pub const DEFAULT_BASE_URL: &str = "https://console.neon.tech/api/v2";

/// HTTP client for the Neon v2 management API.
#[derive(Clone)]
pub struct NeonClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NeonClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn from_config(config: &NeonConfig, api_key: Option<String>) -> Self {
        Self::new(config.base_url.clone(), api_key)
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub(crate) fn build_url(&self, call: &ApiCall) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| BackendError::InvalidUrl(format!("{}: {err}", self.base_url)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BackendError::InvalidUrl(self.base_url.clone()))?;
            segments.pop_if_empty();
            segments.extend(call.segments.iter());
        }
        if !call.query.is_empty() {
            url.query_pairs_mut().extend_pairs(call.query.iter());
        }
        Ok(url)
    }

    fn require_api_key(&self) -> Result<&str, BackendError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(BackendError::MissingApiKey)
    }
}

#[async_trait]
impl NeonApi for NeonClient {
    async fn send(&self, call: ApiCall) -> Result<ApiResult, BackendError> {
        let api_key = self.require_api_key()?;
        let url = self.build_url(&call)?;
        info!(method = %call.method, path = %call.path(), "Calling Neon API");

        let mut builder = self
            .http
            .request(call.method.clone(), url)
            .bearer_auth(api_key)
            .header("Accept", "application/json");
        if let Some(body) = &call.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| BackendError::Network { source })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| BackendError::Network { source })?;
        debug!(status = status.as_u16(), bytes = text.len(), "Neon API responded");

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(ApiResult::from_value(Value::Null));
        }
        let payload: Value =
            serde_json::from_str(&text).map_err(|err| BackendError::Decode(err.to_string()))?;
        Ok(ApiResult::from_value(payload))
    }
}

/// Neon error bodies look like `{"code": "...", "message": "..."}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no error details".to_string()
            } else {
                trimmed.chars().take(300).collect()
            }
        })
}
