//! Neon management functions exposed to the agent. Each entry pairs a
//! [`FunctionSpec`] with a builder that turns validated arguments into an
//! [`ApiCall`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::application::tooling::{
    Arguments, BoxError, FunctionHandler, FunctionRegistry, FunctionSpec, ParamType,
    ParameterSpec, RegistryError,
};
use crate::domain::ApiResult;
use crate::infrastructure::neon::{ApiCall, NeonApi};

pub const DEFAULT_REGION_ID: &str = "azure-eastus2";
pub const DEFAULT_PG_VERSION: u32 = 17;

/// Settings applied to new projects; the model only chooses the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDefaults {
    pub region_id: String,
    pub pg_version: u32,
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        Self {
            region_id: DEFAULT_REGION_ID.to_string(),
            pg_version: DEFAULT_PG_VERSION,
        }
    }
}

type CallBuilder = fn(&Arguments, &ProjectDefaults) -> Result<ApiCall, BoxError>;

struct NeonFunction {
    api: Arc<dyn NeonApi>,
    defaults: Arc<ProjectDefaults>,
    build: CallBuilder,
}

#[async_trait]
impl FunctionHandler for NeonFunction {
    async fn call(&self, arguments: Arguments) -> Result<ApiResult, BoxError> {
        let call = (self.build)(&arguments, &self.defaults)?;
        Ok(self.api.send(call).await?)
    }
}

/// Registers the full catalogue in a stable order.
pub fn register_neon_functions(
    registry: &mut FunctionRegistry,
    api: Arc<dyn NeonApi>,
    defaults: ProjectDefaults,
) -> Result<(), RegistryError> {
    let defaults = Arc::new(defaults);
    for (spec, build) in catalog() {
        registry.register(
            spec,
            NeonFunction {
                api: api.clone(),
                defaults: defaults.clone(),
                build,
            },
        )?;
    }
    Ok(())
}

fn required(name: &str, description: &str) -> ParameterSpec {
    ParameterSpec::required(name, ParamType::String).describe(description)
}

fn project_id() -> ParameterSpec {
    required("project_id", "Neon project ID")
}

fn branch_id() -> ParameterSpec {
    required("branch_id", "Branch ID within the project")
}

fn endpoint_id() -> ParameterSpec {
    required("endpoint_id", "Compute endpoint ID")
}

fn role_name() -> ParameterSpec {
    required("role_name", "Postgres role name")
}

fn database_name() -> ParameterSpec {
    required("database_name", "Database name")
}

fn arg(arguments: &Arguments, name: &str) -> Result<String, BoxError> {
    match arguments.get(name) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        _ => Err(format!("missing argument '{name}'").into()),
    }
}

fn opt_arg(arguments: &Arguments, name: &str) -> Option<String> {
    arg(arguments, name).ok()
}

fn object(arguments: &Arguments, name: &str) -> Result<Value, BoxError> {
    arguments
        .get(name)
        .filter(|value| value.is_object())
        .cloned()
        .ok_or_else(|| format!("missing object argument '{name}'").into())
}

fn entry(spec: FunctionSpec, build: CallBuilder) -> (FunctionSpec, CallBuilder) {
    (spec, build)
}

fn catalog() -> Vec<(FunctionSpec, CallBuilder)> {
    vec![
        // Users and API keys
        entry(
            FunctionSpec::new("get_current_user", "Get details of the current Neon user."),
            |_, _| Ok(ApiCall::get(["users", "me"])),
        ),
        entry(
            FunctionSpec::new("list_api_keys", "List API keys for the account."),
            |_, _| Ok(ApiCall::get(["api_keys"])),
        ),
        entry(
            FunctionSpec::new("create_api_key", "Create a new API key.")
                .param(required("key_name", "Name for the new key")),
            |args, _| {
                Ok(ApiCall::post(["api_keys"]).with_body(json!({"key_name": arg(args, "key_name")?})))
            },
        ),
        entry(
            FunctionSpec::new("delete_api_key", "Revoke an API key.")
                .param(ParameterSpec::required("key_id", ParamType::Integer).describe("API key ID")),
            |args, _| Ok(ApiCall::delete(["api_keys".to_string(), arg(args, "key_id")?])),
        ),
        // Projects
        entry(
            FunctionSpec::new("list_projects", "List all Neon projects."),
            |_, _| Ok(ApiCall::get(["projects"])),
        ),
        entry(
            FunctionSpec::new("get_project", "Get details of a project.").param(project_id()),
            |args, _| Ok(ApiCall::get(["projects".to_string(), arg(args, "project_id")?])),
        ),
        entry(
            FunctionSpec::new(
                "create_project",
                "Create a new Neon project with the given name.",
            )
            .param(required("project_name", "Name of the new project")),
            |args, defaults| {
                Ok(ApiCall::post(["projects"]).with_body(json!({
                    "project": {
                        "name": arg(args, "project_name")?,
                        "pg_version": defaults.pg_version,
                        "region_id": defaults.region_id,
                    }
                })))
            },
        ),
        entry(
            FunctionSpec::new("update_project", "Update project settings.")
                .param(project_id())
                .param(
                    ParameterSpec::required("project", ParamType::Object)
                        .describe("Project fields to change, e.g. {\"name\": \"new-name\"}"),
                ),
            |args, _| {
                Ok(ApiCall::patch(["projects".to_string(), arg(args, "project_id")?])
                    .with_body(json!({"project": object(args, "project")?})))
            },
        ),
        entry(
            FunctionSpec::new("delete_project", "Delete a project.").param(project_id()),
            |args, _| Ok(ApiCall::delete(["projects".to_string(), arg(args, "project_id")?])),
        ),
        entry(
            FunctionSpec::new(
                "get_project_permissions",
                "List users who have access to a project.",
            )
            .param(project_id()),
            |args, _| {
                Ok(ApiCall::get([
                    "projects".to_string(),
                    arg(args, "project_id")?,
                    "permissions".to_string(),
                ]))
            },
        ),
        entry(
            FunctionSpec::new("grant_project_permissions", "Share a project with a user.")
                .param(project_id())
                .param(required("email", "Email address of the user to grant access")),
            |args, _| {
                Ok(ApiCall::post([
                    "projects".to_string(),
                    arg(args, "project_id")?,
                    "permissions".to_string(),
                ])
                .with_body(json!({"email": arg(args, "email")?})))
            },
        ),
        entry(
            FunctionSpec::new("revoke_project_permissions", "Revoke a user's project access.")
                .param(project_id())
                .param(required("permission_id", "Permission ID to revoke")),
            |args, _| {
                Ok(ApiCall::delete([
                    "projects".to_string(),
                    arg(args, "project_id")?,
                    "permissions".to_string(),
                    arg(args, "permission_id")?,
                ]))
            },
        ),
        entry(
            FunctionSpec::new(
                "get_connection_uri",
                "Get a Postgres connection URI for a database and role.",
            )
            .param(project_id())
            .param(database_name())
            .param(role_name())
            .param(ParameterSpec::optional("branch_id", ParamType::String).describe("Branch ID; defaults to the primary branch"))
            .param(ParameterSpec::optional("pooled", ParamType::Boolean).describe("Return a pooled connection URI")),
            |args, _| {
                let mut call = ApiCall::get([
                    "projects".to_string(),
                    arg(args, "project_id")?,
                    "connection_uri".to_string(),
                ])
                .with_query("database_name", arg(args, "database_name")?)
                .with_query("role_name", arg(args, "role_name")?);
                if let Some(branch) = opt_arg(args, "branch_id") {
                    call = call.with_query("branch_id", branch);
                }
                if let Some(Value::Bool(pooled)) = args.get("pooled") {
                    call = call.with_query("pooled", pooled.to_string());
                }
                Ok(call)
            },
        ),
        // Branches
        entry(
            FunctionSpec::new("list_branches", "List branches of a project.").param(project_id()),
            |args, _| {
                Ok(ApiCall::get([
                    "projects".to_string(),
                    arg(args, "project_id")?,
                    "branches".to_string(),
                ]))
            },
        ),
        entry(
            FunctionSpec::new("get_branch", "Get details of a branch.")
                .param(project_id())
                .param(branch_id()),
            |args, _| Ok(ApiCall::get(branch_path(args)?)),
        ),
        entry(
            FunctionSpec::new("create_branch", "Create a new branch in a project.")
                .param(project_id())
                .param(required("branch_name", "Name of the new branch")),
            |args, _| {
                Ok(ApiCall::post([
                    "projects".to_string(),
                    arg(args, "project_id")?,
                    "branches".to_string(),
                ])
                .with_body(json!({"branch": {"name": arg(args, "branch_name")?}})))
            },
        ),
        entry(
            FunctionSpec::new("update_branch", "Update branch settings.")
                .param(project_id())
                .param(branch_id())
                .param(
                    ParameterSpec::required("branch", ParamType::Object)
                        .describe("Branch fields to change, e.g. {\"name\": \"dev\"}"),
                ),
            |args, _| {
                Ok(ApiCall::patch(branch_path(args)?)
                    .with_body(json!({"branch": object(args, "branch")?})))
            },
        ),
        entry(
            FunctionSpec::new("delete_branch", "Delete a branch.")
                .param(project_id())
                .param(branch_id()),
            |args, _| Ok(ApiCall::delete(branch_path(args)?)),
        ),
        entry(
            FunctionSpec::new("set_primary_branch", "Make a branch the project's primary branch.")
                .param(project_id())
                .param(branch_id()),
            |args, _| {
                let mut path = branch_path(args)?;
                path.push("set_as_primary".to_string());
                Ok(ApiCall::post(path))
            },
        ),
        // Databases
        entry(
            FunctionSpec::new("list_databases", "List databases on a branch.")
                .param(project_id())
                .param(branch_id()),
            |args, _| Ok(ApiCall::get(branch_child(args, "databases", None)?)),
        ),
        entry(
            FunctionSpec::new("get_database", "Get details of a database.")
                .param(project_id())
                .param(branch_id())
                .param(database_name()),
            |args, _| {
                Ok(ApiCall::get(branch_child(args, "databases", Some("database_name"))?))
            },
        ),
        entry(
            FunctionSpec::new("create_database", "Create a database on a branch.")
                .param(project_id())
                .param(branch_id())
                .param(database_name())
                .param(ParameterSpec::optional("owner_name", ParamType::String).describe("Role that owns the database")),
            |args, _| {
                let mut database = json!({"name": arg(args, "database_name")?});
                if let Some(owner) = opt_arg(args, "owner_name") {
                    database["owner_name"] = Value::String(owner);
                }
                Ok(ApiCall::post(branch_child(args, "databases", None)?)
                    .with_body(json!({"database": database})))
            },
        ),
        entry(
            FunctionSpec::new("update_database", "Update a database's name or owner.")
                .param(project_id())
                .param(branch_id())
                .param(database_name())
                .param(
                    ParameterSpec::required("database", ParamType::Object)
                        .describe("Database fields to change, e.g. {\"owner_name\": \"app\"}"),
                ),
            |args, _| {
                Ok(ApiCall::patch(branch_child(args, "databases", Some("database_name"))?)
                    .with_body(json!({"database": object(args, "database")?})))
            },
        ),
        entry(
            FunctionSpec::new("delete_database", "Delete a database.")
                .param(project_id())
                .param(branch_id())
                .param(database_name()),
            |args, _| {
                Ok(ApiCall::delete(branch_child(args, "databases", Some("database_name"))?))
            },
        ),
        // Endpoints
        entry(
            FunctionSpec::new("list_endpoints", "List compute endpoints of a branch.")
                .param(project_id())
                .param(branch_id()),
            |args, _| Ok(ApiCall::get(branch_child(args, "endpoints", None)?)),
        ),
        entry(
            FunctionSpec::new("create_endpoint", "Create a compute endpoint for a branch.")
                .param(project_id())
                .param(branch_id())
                .param(
                    ParameterSpec::optional("type", ParamType::String)
                        .with_default(json!("read_write"))
                        .describe("read_write or read_only"),
                ),
            |args, _| {
                Ok(ApiCall::post([
                    "projects".to_string(),
                    arg(args, "project_id")?,
                    "endpoints".to_string(),
                ])
                .with_body(json!({
                    "endpoint": {
                        "branch_id": arg(args, "branch_id")?,
                        "type": arg(args, "type")?,
                    }
                })))
            },
        ),
        entry(
            FunctionSpec::new("update_endpoint", "Update compute endpoint settings.")
                .param(project_id())
                .param(endpoint_id())
                .param(
                    ParameterSpec::required("endpoint", ParamType::Object)
                        .describe("Endpoint fields to change"),
                ),
            |args, _| {
                Ok(ApiCall::patch(endpoint_path(args)?)
                    .with_body(json!({"endpoint": object(args, "endpoint")?})))
            },
        ),
        entry(
            FunctionSpec::new("delete_endpoint", "Delete a compute endpoint.")
                .param(project_id())
                .param(endpoint_id()),
            |args, _| Ok(ApiCall::delete(endpoint_path(args)?)),
        ),
        entry(
            FunctionSpec::new("start_endpoint", "Start a compute endpoint.")
                .param(project_id())
                .param(endpoint_id()),
            |args, _| {
                let mut path = endpoint_path(args)?;
                path.push("start".to_string());
                Ok(ApiCall::post(path))
            },
        ),
        entry(
            FunctionSpec::new("suspend_endpoint", "Suspend a compute endpoint.")
                .param(project_id())
                .param(endpoint_id()),
            |args, _| {
                let mut path = endpoint_path(args)?;
                path.push("suspend".to_string());
                Ok(ApiCall::post(path))
            },
        ),
        // Roles
        entry(
            FunctionSpec::new("list_roles", "List Postgres roles on a branch.")
                .param(project_id())
                .param(branch_id()),
            |args, _| Ok(ApiCall::get(branch_child(args, "roles", None)?)),
        ),
        entry(
            FunctionSpec::new("get_role", "Get details of a role.")
                .param(project_id())
                .param(branch_id())
                .param(role_name()),
            |args, _| Ok(ApiCall::get(branch_child(args, "roles", Some("role_name"))?)),
        ),
        entry(
            FunctionSpec::new("create_role", "Create a Postgres role on a branch.")
                .param(project_id())
                .param(branch_id())
                .param(role_name()),
            |args, _| {
                Ok(ApiCall::post(branch_child(args, "roles", None)?)
                    .with_body(json!({"role": {"name": arg(args, "role_name")?}})))
            },
        ),
        entry(
            FunctionSpec::new("delete_role", "Delete a role.")
                .param(project_id())
                .param(branch_id())
                .param(role_name()),
            |args, _| Ok(ApiCall::delete(branch_child(args, "roles", Some("role_name"))?)),
        ),
        entry(
            FunctionSpec::new("reveal_role_password", "Reveal a role's password.")
                .param(project_id())
                .param(branch_id())
                .param(role_name()),
            |args, _| {
                let mut path = branch_child(args, "roles", Some("role_name"))?;
                path.push("reveal_password".to_string());
                Ok(ApiCall::get(path))
            },
        ),
        entry(
            FunctionSpec::new("reset_role_password", "Reset a role's password.")
                .param(project_id())
                .param(branch_id())
                .param(role_name()),
            |args, _| {
                let mut path = branch_child(args, "roles", Some("role_name"))?;
                path.push("reset_password".to_string());
                Ok(ApiCall::post(path))
            },
        ),
        // Operations
        entry(
            FunctionSpec::new("list_operations", "List recent operations of a project.")
                .param(project_id()),
            |args, _| {
                Ok(ApiCall::get([
                    "projects".to_string(),
                    arg(args, "project_id")?,
                    "operations".to_string(),
                ]))
            },
        ),
        entry(
            FunctionSpec::new("get_operation", "Get details of an operation.")
                .param(project_id())
                .param(required("operation_id", "Operation ID")),
            |args, _| {
                Ok(ApiCall::get([
                    "projects".to_string(),
                    arg(args, "project_id")?,
                    "operations".to_string(),
                    arg(args, "operation_id")?,
                ]))
            },
        ),
        // Consumption
        entry(
            FunctionSpec::new("get_consumption", "Get per-project consumption metrics.")
                .param(ParameterSpec::optional("from", ParamType::String).describe("RFC 3339 start time"))
                .param(ParameterSpec::optional("to", ParamType::String).describe("RFC 3339 end time")),
            |args, _| {
                let mut call = ApiCall::get(["consumption_history", "projects"]);
                for key in ["from", "to"] {
                    if let Some(value) = opt_arg(args, key) {
                        call = call.with_query(key, value);
                    }
                }
                Ok(call)
            },
        ),
    ]
}

fn branch_path(arguments: &Arguments) -> Result<Vec<String>, BoxError> {
    Ok(vec![
        "projects".to_string(),
        arg(arguments, "project_id")?,
        "branches".to_string(),
        arg(arguments, "branch_id")?,
    ])
}

fn branch_child(
    arguments: &Arguments,
    collection: &str,
    item: Option<&str>,
) -> Result<Vec<String>, BoxError> {
    let mut path = branch_path(arguments)?;
    path.push(collection.to_string());
    if let Some(key) = item {
        path.push(arg(arguments, key)?);
    }
    Ok(path)
}

fn endpoint_path(arguments: &Arguments) -> Result<Vec<String>, BoxError> {
    Ok(vec![
        "projects".to_string(),
        arg(arguments, "project_id")?,
        "endpoints".to_string(),
        arg(arguments, "endpoint_id")?,
    ])
}
