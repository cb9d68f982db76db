//! Model service boundary: the [`ModelProvider`] trait the run controller
//! talks to, and an OpenAI-compatible implementation.

mod openai;
mod types;

use async_trait::async_trait;

pub use openai::{AuthScheme, OpenAiCompatibleProvider, RetryPolicy};
pub use types::{ModelError, ModelRequest, ModelResponse};

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Produce the next action for the run: a final answer or a batch of tool calls.
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}
