pub mod results;
pub mod types;

pub use results::{ApiResult, BranchResult, DatabaseResult, ProjectResult, RoleResult};
pub use types::{
    FailureKind, Run, RunStatus, ToolCallRequest, ToolCallResult, ToolFailure, ToolOutput, Turn,
    TurnKind,
};
