//! Backend API client boundary for the Neon management API.

mod client;
mod error;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

pub use client::{DEFAULT_BASE_URL, NeonClient};
pub use error::{BackendError, BackendErrorKind};

use crate::domain::ApiResult;

/// One REST call against the management API. Path segments are kept apart so
/// the client can percent-encode user supplied names.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiCall {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, segments)
    }

    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::POST, segments)
    }

    pub fn patch<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::PATCH, segments)
    }

    pub fn delete<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::DELETE, segments)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// `/a/b/c` rendering for logs and assertions (unencoded).
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[async_trait]
pub trait NeonApi: Send + Sync {
    async fn send(&self, call: ApiCall) -> Result<ApiResult, BackendError>;
}
