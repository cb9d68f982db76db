use std::error::Error as StdError;

use thiserror::Error;

use crate::domain::{FailureKind, ToolFailure};
use crate::infrastructure::neon::BackendError;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Startup-time errors raised while building the registry or its active subset.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("function '{0}' is already registered")]
    DuplicateName(String),
    #[error("function '{0}' is not registered")]
    UnknownFunction(String),
}

/// Errors from a single tool invocation. These are fed back to the model as
/// data and never abort a run.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments for '{function}': {reason}")]
    Validation { function: String, reason: String },
    #[error("function '{function}' failed: {source}")]
    Execution {
        function: String,
        #[source]
        source: BoxError,
    },
}

impl ToolError {
    pub fn validation(function: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            function: function.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ToolError::Validation { .. } => FailureKind::Validation,
            ToolError::Execution { .. } => FailureKind::Execution,
        }
    }

    /// Backend failure category (`not_found`, `rate_limited`, ...) when the
    /// cause came from the Neon API client.
    pub fn category(&self) -> Option<&'static str> {
        match self {
            ToolError::Execution { source, .. } => source
                .downcast_ref::<BackendError>()
                .map(|err| err.kind().as_str()),
            ToolError::Validation { .. } => None,
        }
    }

    pub fn to_failure(&self) -> ToolFailure {
        let cause = match self {
            ToolError::Execution { source, .. } => Some(error_chain(source.as_ref())),
            ToolError::Validation { .. } => None,
        };
        ToolFailure {
            kind: self.kind(),
            message: self.to_string(),
            cause,
            category: self.category().map(str::to_string),
        }
    }
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut current = error.source();
    while let Some(next) = current {
        parts.push(next.to_string());
        current = next.source();
    }
    parts.join(": ")
}
