mod controller;
mod errors;
mod models;


pub use controller::RunController;
pub use errors::{RunError, Termination};
pub use models::{RunConfig, RunOutcome, RunStep};
