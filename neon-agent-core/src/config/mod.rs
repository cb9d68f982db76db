use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::application::neon::{DEFAULT_PG_VERSION, DEFAULT_REGION_ID, ProjectDefaults};
use crate::infrastructure::model::AuthScheme;
use crate::infrastructure::neon::DEFAULT_BASE_URL;

pub const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";
pub const ENV_PATH: &str = "config/.env";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TOOLS: &[&str] = &["create_project"];
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_ROUND_TRIPS: usize = 8;

const DEFAULT_PROVIDER_ID: &str = "openai";
const DEFAULT_PROVIDER_ENDPOINT: &str = "https://api.openai.com";
const DEFAULT_PROVIDER_API_PATH: &str = "/v1/chat/completions";
const DEFAULT_PROVIDER_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_MAX_ATTEMPTS: u32 = 2;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 250;

const DEFAULT_NEON_KEY_ENV: &str = "NEON_API_KEY";
pub const MODEL_ENV: &str = "NEON_AGENT_MODEL";

/// `{date}` is replaced with the current UTC date when the session starts.
pub const DEFAULT_INSTRUCTIONS: &str = "You are an AI assistant that helps users create and manage \
Neon projects, databases and branches. Use the provided functions to perform actions. \
The current date is {date}.";

static ENV_LOADER: Once = Once::new();

/// Loads `config/.env`, then `.env` from the working directory. Variables
/// already set in the process win.
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = dotenvy::from_filename(ENV_PATH);
        let _ = dotenvy::dotenv();
    });
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model: String,
    pub tools: Vec<String>,
    pub call_timeout: Duration,
    pub max_round_trips: usize,
    pub instructions: Option<String>,
    pub provider: ProviderConfig,
    pub neon: NeonConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub id: String,
    pub endpoint: String,
    pub api_path: String,
    pub api_key_env: String,
    pub auth: AuthScheme,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeonConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub region_id: String,
    pub pg_version: u32,
}

/// Values given on the command line; `None` keeps the file's value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub tools: Option<Vec<String>>,
    pub call_timeout_secs: Option<u64>,
    pub max_round_trips: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    model: Option<String>,
    tools: Option<Vec<String>>,
    call_timeout_secs: Option<u64>,
    max_round_trips: Option<usize>,
    instructions: Option<String>,
    #[serde(default)]
    provider: RawProvider,
    #[serde(default)]
    neon: RawNeon,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawProvider {
    id: Option<String>,
    endpoint: Option<String>,
    api_path: Option<String>,
    api_key_env: Option<String>,
    auth: Option<AuthScheme>,
    max_attempts: Option<u32>,
    initial_backoff_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawNeon {
    base_url: Option<String>,
    api_key_env: Option<String>,
    region_id: Option<String>,
    pg_version: Option<u32>,
}

impl AppConfig {
    /// Reads `path`, or `config/agent.toml` when no path is given. A missing
    /// default file yields the built-in defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            let expanded = expand_path(path);
            return read_config(&expanded);
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        match read_config(default_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("Configuration file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies `NEON_AGENT_MODEL` through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(MODEL_ENV).filter(|value| !value.trim().is_empty()) {
            debug!(model = %model, "Model overridden from environment");
            self.model = model.trim().to_string();
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(tools) = overrides.tools {
            self.tools = tools;
        }
        if let Some(secs) = overrides.call_timeout_secs {
            self.call_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = overrides.max_round_trips {
            self.max_round_trips = limit;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".into()));
        }
        if self.max_round_trips == 0 {
            return Err(ConfigError::Invalid(
                "max_round_trips must be at least 1".into(),
            ));
        }
        if self.call_timeout < Duration::from_secs(1) {
            return Err(ConfigError::Invalid(
                "call_timeout_secs must be at least 1".into(),
            ));
        }
        if self.tools.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid("tool names must not be empty".into()));
        }
        Ok(())
    }

    /// Instructions with `{date}` filled in, falling back to the built-in text.
    pub fn render_instructions(&self, date: &str) -> String {
        self.instructions
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTIONS)
            .replace("{date}", date)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            tools: DEFAULT_TOOLS.iter().map(|name| name.to_string()).collect(),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
            instructions: None,
            provider: ProviderConfig::default(),
            neon: NeonConfig::default(),
        }
    }
}

impl ProviderConfig {
    pub fn api_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.api_key_env).filter(|key| !key.trim().is_empty())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_PROVIDER_ID.to_string(),
            endpoint: DEFAULT_PROVIDER_ENDPOINT.to_string(),
            api_path: DEFAULT_PROVIDER_API_PATH.to_string(),
            api_key_env: DEFAULT_PROVIDER_KEY_ENV.to_string(),
            auth: AuthScheme::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
        }
    }
}

impl NeonConfig {
    pub fn api_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.api_key_env).filter(|key| !key.trim().is_empty())
    }

    pub fn project_defaults(&self) -> ProjectDefaults {
        ProjectDefaults {
            region_id: self.region_id.clone(),
            pg_version: self.pg_version,
        }
    }
}

impl Default for NeonConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_NEON_KEY_ENV.to_string(),
            region_id: DEFAULT_REGION_ID.to_string(),
            pg_version: DEFAULT_PG_VERSION,
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(text) => PathBuf::from(shellexpand::tilde(text).into_owned()),
        None => path.to_path_buf(),
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading agent configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let config = AppConfig::from(parsed);
    config.validate()?;
    Ok(config)
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            model: raw.model.unwrap_or(defaults.model),
            tools: raw.tools.unwrap_or(defaults.tools),
            call_timeout: raw
                .call_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.call_timeout),
            max_round_trips: raw.max_round_trips.unwrap_or(defaults.max_round_trips),
            instructions: raw.instructions,
            provider: raw.provider.into(),
            neon: raw.neon.into(),
        }
    }
}

impl From<RawProvider> for ProviderConfig {
    fn from(raw: RawProvider) -> Self {
        let defaults = ProviderConfig::default();
        Self {
            id: raw.id.unwrap_or(defaults.id),
            endpoint: raw.endpoint.unwrap_or(defaults.endpoint),
            api_path: raw.api_path.unwrap_or(defaults.api_path),
            api_key_env: raw.api_key_env.unwrap_or(defaults.api_key_env),
            auth: raw.auth.unwrap_or(defaults.auth),
            max_attempts: raw.max_attempts.unwrap_or(defaults.max_attempts),
            initial_backoff_ms: raw.initial_backoff_ms.unwrap_or(defaults.initial_backoff_ms),
        }
    }
}

impl From<RawNeon> for NeonConfig {
    fn from(raw: RawNeon) -> Self {
        let defaults = NeonConfig::default();
        Self {
            base_url: raw.base_url.unwrap_or(defaults.base_url),
            api_key_env: raw.api_key_env.unwrap_or(defaults.api_key_env),
            region_id: raw.region_id.unwrap_or(defaults.region_id),
            pg_version: raw.pg_version.unwrap_or(defaults.pg_version),
        }
    }
}
