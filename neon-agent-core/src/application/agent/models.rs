use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::application::formatter;
use crate::domain::{Run, ToolOutput};

const DEFAULT_MAX_ROUND_TRIPS: usize = 8;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed for the lifetime of a controller.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model: String,
    pub instructions: Option<String>,
    pub call_timeout: Duration,
    /// Tool batches a single run may execute before the model must answer.
    pub max_round_trips: usize,
}

impl RunConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            instructions: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_max_round_trips(mut self, max_round_trips: usize) -> Self {
        self.max_round_trips = max_round_trips;
        self
    }
}

/// One executed tool call, in request order.
#[derive(Debug, Clone, Serialize)]
pub struct RunStep {
    pub call_id: String,
    pub function: String,
    pub arguments: Value,
    pub output: ToolOutput,
}

impl RunStep {
    pub fn success(&self) -> bool {
        self.output.is_success()
    }

    /// Confirmation line for a successful step.
    pub fn confirmation(&self) -> Option<String> {
        match &self.output {
            ToolOutput::Success { result } => Some(formatter::format(result)),
            ToolOutput::Failure { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run: Run,
    pub response: String,
    pub steps: Vec<RunStep>,
}
