//! Startup wiring. Everything the console needs is built here once and
//! passed down explicitly.

use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::agent::{RunConfig, RunController};
use crate::application::neon::register_neon_functions;
use crate::application::session::Session;
use crate::application::tooling::{FunctionRegistry, RegistryError};
use crate::config::{AppConfig, ConfigError};
use crate::infrastructure::model::OpenAiCompatibleProvider;
use crate::infrastructure::neon::NeonClient;

const USER_AGENT: &str = concat!("neon-agent/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

impl StartupError {
    pub fn user_message(&self) -> String {
        match self {
            StartupError::Config(err) => format!("Configuration problem: {err}"),
            StartupError::Registry(RegistryError::UnknownFunction(name)) => {
                format!("Configured tool \"{name}\" does not exist.")
            }
            StartupError::Registry(err) => err.to_string(),
            StartupError::Http(_) => "Could not initialise the HTTP client.".to_string(),
        }
    }
}

pub struct AppContext {
    pub config: AppConfig,
    pub registry: FunctionRegistry,
    pub controller: RunController<OpenAiCompatibleProvider>,
}

impl AppContext {
    pub fn bootstrap(config: AppConfig) -> Result<Self, StartupError> {
        Self::bootstrap_with(config, |key| std::env::var(key).ok())
    }

    /// Same as [`AppContext::bootstrap`] with API keys resolved through `lookup`.
    pub fn bootstrap_with<F>(config: AppConfig, lookup: F) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        config.validate()?;
        let http = Client::builder().user_agent(USER_AGENT).build()?;

        let neon_key = config.neon.api_key_with(&lookup);
        if neon_key.is_none() {
            warn!(env = %config.neon.api_key_env, "Neon API key is not set; Neon calls will fail");
        }
        let neon = NeonClient::from_config(&config.neon, neon_key).with_client(http.clone());

        let mut registry = FunctionRegistry::new();
        register_neon_functions(&mut registry, Arc::new(neon), config.neon.project_defaults())?;
        let tools = registry.active_subset(&config.tools)?;

        let model_key = config.provider.api_key_with(&lookup);
        if model_key.is_none() {
            warn!(env = %config.provider.api_key_env, "Model provider API key is not set");
        }
        let provider =
            OpenAiCompatibleProvider::from_config(&config.provider, model_key).with_client(http);

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let run_config = RunConfig::new(config.model.clone())
            .with_instructions(config.render_instructions(&today))
            .with_call_timeout(config.call_timeout)
            .with_max_round_trips(config.max_round_trips);

        let session = Arc::new(Session::new());
        info!(
            session_id = %session.id(),
            model = %config.model,
            provider = %config.provider.id,
            tools = tools.len(),
            "Agent session ready"
        );
        let controller = RunController::new(session, Arc::new(provider), tools, run_config);

        Ok(Self {
            config,
            registry,
            controller,
        })
    }
}
