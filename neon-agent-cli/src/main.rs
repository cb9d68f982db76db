mod cli;

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use neon_agent_core::config::ensure_env_loaded;
use neon_agent_core::{AppConfig, AppContext, ConsoleSignals, Interrupt, console};
use tokio::io::{self, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    debug!(config = ?cli.config, model = ?cli.model, "CLI arguments parsed");

    ensure_env_loaded();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env();
    config.apply_overrides(cli.overrides());

    let context = match AppContext::bootstrap(config) {
        Ok(context) => context,
        Err(err) => {
            eprintln!("❌ Error: {}", err.user_message());
            std::process::exit(1);
        }
    };
    info!(
        session_id = %context.controller.session().id(),
        "Neon agent ready"
    );

    let signals = Arc::new(ConsoleSignals::new());
    spawn_interrupt_handler(signals.clone());

    let stdin = BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    console::run_loop(&context.controller, stdin, &mut stdout, &signals).await?;
    info!("Console closed");
    Ok(())
}

fn spawn_interrupt_handler(signals: Arc<ConsoleSignals>) {
    tokio::spawn(async move {
        loop {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "Unable to listen for Ctrl-C");
                return;
            }
            match signals.interrupt() {
                Interrupt::CancelledRun => info!("Cancelling the running command"),
                Interrupt::Shutdown => {
                    info!("Interrupt received while idle; shutting down");
                    return;
                }
            }
        }
    });
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}
