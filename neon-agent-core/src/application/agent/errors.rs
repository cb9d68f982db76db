use thiserror::Error;

use crate::infrastructure::model::ModelError;

/// Errors that end a run. Tool failures never show up here; they are
/// returned to the model as data.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("session already has an active run")]
    SessionBusy,
    #[error("run {run_id} failed: {source}")]
    Failed {
        run_id: String,
        #[source]
        source: ModelError,
    },
    #[error("run {run_id} exceeded the limit of {limit} tool round trips")]
    ExceededStepLimit { run_id: String, limit: usize },
    #[error("run {run_id} was cancelled")]
    Cancelled { run_id: String },
}

/// How a run ended without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Busy,
    ModelFailure,
    StepLimit,
    Cancelled,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Termination::Busy => "session_busy",
            Termination::ModelFailure => "run_failed",
            Termination::StepLimit => "exceeded_step_limit",
            Termination::Cancelled => "run_cancelled",
        }
    }
}

impl RunError {
    pub fn termination(&self) -> Termination {
        match self {
            RunError::SessionBusy => Termination::Busy,
            RunError::Failed { .. } => Termination::ModelFailure,
            RunError::ExceededStepLimit { .. } => Termination::StepLimit,
            RunError::Cancelled { .. } => Termination::Cancelled,
        }
    }

    /// `None` when the run was refused before it started.
    pub fn run_id(&self) -> Option<&str> {
        match self {
            RunError::SessionBusy => None,
            RunError::Failed { run_id, .. }
            | RunError::ExceededStepLimit { run_id, .. }
            | RunError::Cancelled { run_id } => Some(run_id.as_str()),
        }
    }

    /// Console text. Model failures lead with the provider's own error text.
    pub fn user_message(&self) -> String {
        match self {
            RunError::SessionBusy => {
                "Another command is still running. Wait for it to finish.".to_string()
            }
            RunError::Failed { source, .. } => format!("{source} ({})", source.user_message()),
            RunError::ExceededStepLimit { limit, .. } => format!(
                "The assistant needed more than {limit} tool round trips and was stopped."
            ),
            RunError::Cancelled { .. } => "The command was cancelled.".to_string(),
        }
    }
}
