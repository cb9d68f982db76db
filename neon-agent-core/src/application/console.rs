//! Line-oriented command loop: read a command, run it, print the outcome.

use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::agent::{RunController, RunError, RunOutcome};
use crate::infrastructure::model::ModelProvider;

pub const PROMPT: &str = "Enter a command (or 'exit' to quit): ";
const EXIT_COMMAND: &str = "exit";

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What an interrupt ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    CancelledRun,
    Shutdown,
}

/// Shared between the loop and whatever delivers interrupts (Ctrl-C in the
/// binary). An interrupt cancels the command in flight, or stops the loop
/// when it is idle.
#[derive(Debug, Default)]
pub struct ConsoleSignals {
    shutdown: CancellationToken,
    current: Mutex<Option<CancellationToken>>,
}

impl ConsoleSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) -> Interrupt {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(token) => {
                token.cancel();
                Interrupt::CancelledRun
            }
            None => {
                self.shutdown.cancel();
                Interrupt::Shutdown
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn begin_run(&self) -> CancellationToken {
        let token = self.shutdown.child_token();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        token
    }

    fn finish_run(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Runs until `exit`, end of input, or an idle interrupt. Run errors are
/// printed and never end the loop.
pub async fn run_loop<P, R, W>(
    controller: &RunController<P>,
    input: R,
    output: &mut W,
    signals: &ConsoleSignals,
) -> Result<(), ConsoleError>
where
    P: ModelProvider,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signals.shutdown.cancelled() => {
                info!("Console interrupted while idle");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if command.eq_ignore_ascii_case(EXIT_COMMAND) {
            info!("Exit requested");
            break;
        }

        debug!(chars = command.len(), "Dispatching console command");
        let token = signals.begin_run();
        let result = controller.run(command, &token).await;
        signals.finish_run();

        let rendered = render(&result);
        output.write_all(rendered.as_bytes()).await?;
        output.flush().await?;
    }

    output.flush().await?;
    Ok(())
}

/// Console text for one command, newline terminated.
pub fn render(result: &Result<RunOutcome, RunError>) -> String {
    match result {
        Ok(outcome) => {
            let mut text = String::new();
            for confirmation in outcome.steps.iter().filter_map(|step| step.confirmation()) {
                text.push_str(&confirmation);
                text.push('\n');
            }
            text.push_str(&format!("📜 {}\n", outcome.response));
            text
        }
        Err(err) if err.run_id().is_some() => format!("❌ Run failed: {}\n", err.user_message()),
        Err(err) => format!("❌ Error: {}\n", err.user_message()),
    }
}
