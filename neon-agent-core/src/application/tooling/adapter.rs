use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use super::error::ToolError;
use super::registry::{Arguments, FunctionSpec, ParamType, ParameterSpec, RegisteredFunction};
use crate::domain::ApiResult;

/// Active subset of the registry as seen by a run: schema export plus
/// validated dispatch.
#[derive(Clone)]
pub struct ToolAdapter {
    functions: Vec<Arc<RegisteredFunction>>,
    index: HashMap<String, usize>,
}

impl ToolAdapter {
    pub(crate) fn new(functions: Vec<Arc<RegisteredFunction>>) -> Self {
        let index = functions
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.spec.name.clone(), idx))
            .collect();
        Self { functions, index }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Exposed specs in registration order.
    pub fn schema(&self) -> Vec<FunctionSpec> {
        self.functions
            .iter()
            .map(|entry| entry.spec.clone())
            .collect()
    }

    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<ApiResult, ToolError> {
        let Some(entry) = self.index.get(name).map(|&idx| &self.functions[idx]) else {
            warn!(requested_function = %name, "Model requested a function outside the active subset");
            return Err(ToolError::validation(
                name,
                "function is not available in this session",
            ));
        };

        let arguments = validate_arguments(&entry.spec, arguments)
            .map_err(|reason| ToolError::validation(name, reason))?;

        debug!(function = %name, args = arguments.len(), "Dispatching function");
        entry
            .handler
            .call(arguments)
            .await
            .map_err(|source| ToolError::Execution {
                function: name.to_string(),
                source,
            })
    }
}

/// Checks `arguments` against `spec`, coercing loosely typed scalars and
/// filling declared defaults.
pub fn validate_arguments(spec: &FunctionSpec, arguments: Value) -> Result<Arguments, String> {
    let provided = match arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        other => {
            return Err(format!(
                "arguments must be a JSON object, got {}",
                type_name(&other)
            ));
        }
    };

    if let Some(unknown) = provided.keys().find(|key| spec.parameter(key).is_none()) {
        return Err(format!("unknown parameter '{unknown}'"));
    }

    let mut validated = Map::new();
    for param in &spec.parameters {
        match provided.get(&param.name) {
            Some(value) if !value.is_null() => {
                let coerced = coerce(param, value)?;
                validated.insert(param.name.clone(), coerced);
            }
            _ if param.required => {
                return Err(format!("missing required parameter '{}'", param.name));
            }
            _ => {
                if let Some(default) = &param.default {
                    validated.insert(param.name.clone(), default.clone());
                }
            }
        }
    }
    Ok(validated)
}

fn coerce(param: &ParameterSpec, value: &Value) -> Result<Value, String> {
    let coerced = match (param.param_type, value) {
        (ParamType::String, Value::String(_)) => Some(value.clone()),
        (ParamType::String, Value::Number(number)) => Some(Value::String(number.to_string())),
        (ParamType::String, Value::Bool(flag)) => Some(Value::String(flag.to_string())),

        (ParamType::Integer, Value::Number(number)) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                    .map(|float| float as i64)
            })
            .map(Value::from),
        (ParamType::Integer, Value::String(text)) => {
            text.trim().parse::<i64>().ok().map(Value::from)
        }

        (ParamType::Number, Value::Number(_)) => Some(value.clone()),
        (ParamType::Number, Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),

        (ParamType::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ParamType::Boolean, Value::String(text)) => match text.trim().to_ascii_lowercase().as_str()
        {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },

        (ParamType::Object, Value::Object(_)) => Some(value.clone()),
        (ParamType::Array, Value::Array(_)) => Some(value.clone()),
        _ => None,
    };

    coerced.ok_or_else(|| {
        format!(
            "parameter '{}' expects {}, got {}",
            param.name,
            param.param_type.as_str(),
            type_name(value)
        )
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
