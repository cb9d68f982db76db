//! # neon-agent-core
//!
//! Tool-calling agent loop for managing Neon resources from natural
//! language. A [`RunController`] turns one user command into model queries
//! and function calls over a fixed subset of the Neon management API, and
//! records every step in the conversation [`Session`].
//!
//! The binary crate only parses flags and wires Ctrl-C; everything else is
//! assembled by [`AppContext::bootstrap`].

pub mod application;
pub mod config;
pub mod context;
pub mod domain;
pub mod infrastructure;

pub use application::agent::{RunConfig, RunController, RunError, RunOutcome, RunStep, Termination};
pub use application::console::{self, ConsoleSignals, Interrupt};
pub use application::session::{History, Session};
pub use application::{formatter, tooling};
pub use config::{AppConfig, ConfigError, ConfigOverrides};
pub use context::{AppContext, StartupError};
pub use infrastructure::{model, neon};
