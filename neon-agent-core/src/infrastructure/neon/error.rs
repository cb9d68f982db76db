use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    NotFound,
    PermissionDenied,
    Validation,
    RateLimited,
    Transient,
    Unexpected,
}

impl BackendErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendErrorKind::NotFound => "not_found",
            BackendErrorKind::PermissionDenied => "permission_denied",
            BackendErrorKind::Validation => "validation",
            BackendErrorKind::RateLimited => "rate_limited",
            BackendErrorKind::Transient => "transient",
            BackendErrorKind::Unexpected => "unexpected",
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            404 => BackendErrorKind::NotFound,
            401 | 403 => BackendErrorKind::PermissionDenied,
            400 | 409 | 422 => BackendErrorKind::Validation,
            429 => BackendErrorKind::RateLimited,
            500..=599 => BackendErrorKind::Transient,
            _ => BackendErrorKind::Unexpected,
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Neon API key is not configured")]
    MissingApiKey,
    #[error("Neon API returned {status} ({}): {message}", status_label(.status))]
    Status { status: u16, message: String },
    #[error("network error calling Neon API: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid Neon API URL: {0}")]
    InvalidUrl(String),
    #[error("Neon API returned an unreadable body: {0}")]
    Decode(String),
}

fn status_label(status: &u16) -> &'static str {
    BackendErrorKind::from_status(*status).as_str()
}

impl BackendError {
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            BackendError::MissingApiKey => BackendErrorKind::PermissionDenied,
            BackendError::Status { status, .. } => BackendErrorKind::from_status(*status),
            BackendError::Network { .. } => BackendErrorKind::Transient,
            BackendError::InvalidUrl(_) | BackendError::Decode(_) => BackendErrorKind::Unexpected,
        }
    }
}
