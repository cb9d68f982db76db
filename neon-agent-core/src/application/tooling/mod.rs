//! Function registry and the active-subset adapter the run controller
//! dispatches through.

mod adapter;
mod error;
mod registry;

pub use adapter::{ToolAdapter, validate_arguments};
pub use error::{BoxError, RegistryError, ToolError};
pub use registry::{
    Arguments, FnHandler, FunctionHandler, FunctionRegistry, FunctionSpec, ParamType,
    ParameterSpec, handler_fn,
};
