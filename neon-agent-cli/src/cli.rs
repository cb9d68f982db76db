use std::path::PathBuf;

use clap::Parser;
use neon_agent_core::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(
    name = "neon-agent",
    version,
    about = "Manage Neon projects, branches and databases in plain language"
)]
pub struct Cli {
    /// Path to the TOML configuration (defaults to config/agent.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Model identifier sent to the provider.
    #[arg(long)]
    pub model: Option<String>,
    /// Comma separated list of functions the agent may call.
    #[arg(long, value_delimiter = ',')]
    pub tools: Option<Vec<String>>,
    /// Timeout applied to every model and function call.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    /// Tool batches allowed per command before the run is stopped.
    #[arg(long)]
    pub max_round_trips: Option<usize>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model: self.model.clone(),
            tools: self.tools.clone(),
            call_timeout_secs: self.timeout_secs,
            max_round_trips: self.max_round_trips,
        }
    }
}
