use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::errors::RunError;
use super::models::{RunConfig, RunOutcome, RunStep};
use crate::application::session::Session;
use crate::application::tooling::ToolAdapter;
use crate::domain::{FailureKind, Run, ToolCallRequest, ToolCallResult, ToolFailure, TurnKind};
use crate::infrastructure::model::{ModelError, ModelProvider, ModelRequest, ModelResponse};

/// Drives one user command at a time through the model/tool loop and records
/// every step in the session.
pub struct RunController<P: ModelProvider> {
    session: Arc<Session>,
    provider: Arc<P>,
    tools: ToolAdapter,
    config: RunConfig,
    last_run: Mutex<Option<Run>>,
}

impl<P: ModelProvider> RunController<P> {
    pub fn new(
        session: Arc<Session>,
        provider: Arc<P>,
        tools: ToolAdapter,
        config: RunConfig,
    ) -> Self {
        Self {
            session,
            provider,
            tools,
            config,
            last_run: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn tools(&self) -> &ToolAdapter {
        &self.tools
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Most recent run, terminal once `run` has returned.
    pub fn last_run(&self) -> Option<Run> {
        self.last_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn run(
        &self,
        prompt: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        let Some(_guard) = self.session.try_begin_run() else {
            warn!(session_id = %self.session.id(), "Rejected run: session busy");
            return Err(RunError::SessionBusy);
        };

        let mut run = Run::start(self.session.id());
        info!(run_id = %run.id, session_id = %run.session_id, "Run started");
        self.session.append(TurnKind::UserMessage {
            text: prompt.into(),
        });

        let result = self.drive(&mut run, cancel).await;
        match &result {
            Ok((_, steps)) => {
                run.complete();
                info!(
                    run_id = %run.id,
                    round_trips = run.round_trips,
                    steps = steps.len(),
                    "Run completed"
                );
            }
            Err(err) => {
                run.fail(err.to_string());
                error!(
                    run_id = %run.id,
                    termination = err.termination().as_str(),
                    error = %err,
                    "Run failed"
                );
            }
        }
        *self
            .last_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(run.clone());

        result.map(|(response, steps)| RunOutcome {
            run,
            response,
            steps,
        })
    }

    async fn drive(
        &self,
        run: &mut Run,
        cancel: &CancellationToken,
    ) -> Result<(String, Vec<RunStep>), RunError> {
        let mut steps = Vec::new();

        loop {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled {
                    run_id: run.id.clone(),
                });
            }

            let request = ModelRequest {
                model: self.config.model.clone(),
                instructions: self.config.instructions.clone(),
                history: self.session.history(),
                tools: self.tools.schema(),
            };
            debug!(
                run_id = %run.id,
                round_trips = run.round_trips,
                turns = request.history.len(),
                "Submitting run state to model provider"
            );

            let response = match timeout(self.config.call_timeout, self.provider.complete(request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(source)) => return Err(self.failed(run, source)),
                Err(_) => {
                    let source = ModelError::Timeout {
                        after: self.config.call_timeout,
                    };
                    return Err(self.failed(run, source));
                }
            };

            let batch = match response {
                ModelResponse::Final(text) => {
                    self.session.append(TurnKind::AssistantMessage { text: text.clone() });
                    return Ok((text, steps));
                }
                ModelResponse::ToolCalls(batch) if batch.is_empty() => {
                    let source = ModelError::invalid_response(
                        self.config.model.clone(),
                        "tool call response contained no calls",
                    );
                    return Err(self.failed(run, source));
                }
                ModelResponse::ToolCalls(batch) => batch,
            };

            if run.round_trips >= self.config.max_round_trips {
                warn!(
                    run_id = %run.id,
                    limit = self.config.max_round_trips,
                    "Model exceeded the tool round-trip limit"
                );
                return Err(RunError::ExceededStepLimit {
                    run_id: run.id.clone(),
                    limit: self.config.max_round_trips,
                });
            }
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled {
                    run_id: run.id.clone(),
                });
            }

            run.round_trips += 1;
            info!(run_id = %run.id, calls = batch.len(), "Executing tool batch");
            steps.extend(self.execute_batch(batch).await);
        }
    }

    fn failed(&self, run: &Run, source: ModelError) -> RunError {
        RunError::Failed {
            run_id: run.id.clone(),
            source,
        }
    }

    /// Requests are recorded before any call starts; results are recorded in
    /// request order once the whole batch has settled. Call ids are only
    /// unique within one model response, so a repeated id inside the batch is
    /// dropped and ids seen in earlier turns are recorded again.
    async fn execute_batch(&self, mut batch: Vec<ToolCallRequest>) -> Vec<RunStep> {
        let mut seen = HashSet::new();
        batch.retain(|request| {
            let fresh = seen.insert(request.id.clone());
            if !fresh {
                debug!(call_id = %request.id, "Dropping repeated tool call id in batch");
            }
            fresh
        });

        for request in &batch {
            self.session
                .append(TurnKind::ToolCallRequest(request.clone()));
        }

        let results = join_all(batch.iter().map(|request| self.execute_one(request))).await;
        for result in &results {
            self.session
                .append(TurnKind::ToolCallResult(result.clone()));
        }

        batch
            .into_iter()
            .zip(results)
            .map(|(request, result)| RunStep {
                call_id: request.id,
                function: request.function,
                arguments: request.arguments,
                output: result.output,
            })
            .collect()
    }

    async fn execute_one(&self, request: &ToolCallRequest) -> ToolCallResult {
        let call = self
            .tools
            .invoke(&request.function, request.arguments.clone());
        match timeout(self.config.call_timeout, call).await {
            Ok(Ok(result)) => {
                debug!(call_id = %request.id, function = %request.function, "Tool call succeeded");
                ToolCallResult::success(request, result)
            }
            Ok(Err(err)) => {
                warn!(
                    call_id = %request.id,
                    function = %request.function,
                    kind = err.kind().as_str(),
                    error = %err,
                    "Tool call failed"
                );
                ToolCallResult::failure(request, err.to_failure())
            }
            Err(_) => {
                warn!(call_id = %request.id, function = %request.function, "Tool call timed out");
                ToolCallResult::failure(
                    request,
                    ToolFailure {
                        kind: FailureKind::Timeout,
                        message: format!(
                            "function '{}' timed out after {}s",
                            request.function,
                            self.config.call_timeout.as_secs()
                        ),
                        cause: None,
                        category: None,
                    },
                )
            }
        }
    }
}
