use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::adapter::ToolAdapter;
use super::error::{BoxError, RegistryError};
use crate::domain::ApiResult;

/// Validated, default-filled arguments handed to a handler.
pub type Arguments = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            default: None,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|param| param.name == name)
    }

    /// JSON-Schema object describing the parameters. `required` keeps
    /// declaration order; `properties` is a plain JSON map keyed by name.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            let mut property = Map::new();
            property.insert("type".into(), json!(param.param_type.as_str()));
            if let Some(description) = &param.description {
                property.insert("description".into(), json!(description));
            }
            if let Some(default) = &param.default {
                property.insert("default".into(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(property));
            if param.required {
                required.push(json!(param.name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

#[async_trait]
pub trait FunctionHandler: Send + Sync {
    async fn call(&self, arguments: Arguments) -> Result<ApiResult, BoxError>;
}

/// Adapts an async closure into a [`FunctionHandler`].
pub struct FnHandler<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ApiResult, BoxError>> + Send,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> FunctionHandler for FnHandler<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ApiResult, BoxError>> + Send,
{
    async fn call(&self, arguments: Arguments) -> Result<ApiResult, BoxError> {
        (self.0)(arguments).await
    }
}

pub(crate) struct RegisteredFunction {
    pub spec: FunctionSpec,
    pub handler: Arc<dyn FunctionHandler>,
}

/// Every function the agent could be allowed to call. Built once at startup;
/// runs only ever see it through a [`ToolAdapter`].
#[derive(Default)]
pub struct FunctionRegistry {
    entries: Vec<Arc<RegisteredFunction>>,
    index: HashMap<String, usize>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, spec: FunctionSpec, handler: H) -> Result<(), RegistryError>
    where
        H: FunctionHandler + 'static,
    {
        self.register_shared(spec, Arc::new(handler))
    }

    pub fn register_shared(
        &mut self,
        spec: FunctionSpec,
        handler: Arc<dyn FunctionHandler>,
    ) -> Result<(), RegistryError> {
        if self.index.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateName(spec.name));
        }
        debug!(function = %spec.name, params = spec.parameters.len(), "Registered function");
        self.index.insert(spec.name.clone(), self.entries.len());
        self.entries
            .push(Arc::new(RegisteredFunction { spec, handler }));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn spec(&self, name: &str) -> Option<&FunctionSpec> {
        self.index.get(name).map(|&idx| &self.entries[idx].spec)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.spec.name.as_str())
    }

    /// Read-only view limited to `names`; the view keeps registration order
    /// regardless of the order `names` arrive in.
    pub fn active_subset<I, S>(&self, names: I) -> Result<ToolAdapter, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected = HashSet::new();
        for name in names {
            let name = name.as_ref();
            let idx = self
                .index
                .get(name)
                .copied()
                .ok_or_else(|| RegistryError::UnknownFunction(name.to_string()))?;
            selected.insert(idx);
        }

        let mut indices: Vec<usize> = selected.into_iter().collect();
        indices.sort_unstable();
        let functions: Vec<_> = indices
            .into_iter()
            .map(|idx| self.entries[idx].clone())
            .collect();
        info!(
            active = functions.len(),
            registered = self.entries.len(),
            "Built active tool subset"
        );
        Ok(ToolAdapter::new(functions))
    }
}
