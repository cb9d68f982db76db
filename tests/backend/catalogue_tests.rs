// Catalogue tests - how each Neon function shapes its REST call.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::RecordingNeon;
use neon_agent_core::application::neon::{ProjectDefaults, register_neon_functions};
use neon_agent_core::tooling::{FunctionRegistry, ToolError};
use reqwest::Method;
use serde_json::{Value, json};

async fn invoke(name: &str, arguments: Value) -> (Method, String, Vec<(String, String)>, Option<Value>) {
    let neon = Arc::new(RecordingNeon::new());
    let mut registry = FunctionRegistry::new();
    register_neon_functions(&mut registry, neon.clone(), ProjectDefaults::default())
        .expect("register catalogue");
    let tools = registry.active_subset([name]).expect("subset");

    tools.invoke(name, arguments).await.expect("call succeeds");

    let mut calls = neon.calls().await;
    assert_eq!(calls.len(), 1, "{name} should issue exactly one call");
    let call = calls.remove(0);
    let path = call.path();
    (call.method, path, call.query, call.body)
}

#[tokio::test]
async fn account_level_functions() {
    let (method, path, _, _) = invoke("get_current_user", json!({})).await;
    assert_eq!((method, path.as_str()), (Method::GET, "/users/me"));

    let (method, path, _, body) = invoke("create_api_key", json!({"key_name": "ci"})).await;
    assert_eq!((method, path.as_str()), (Method::POST, "/api_keys"));
    assert_eq!(body, Some(json!({"key_name": "ci"})));

    let (method, path, _, _) = invoke("delete_api_key", json!({"key_id": "1234"})).await;
    assert_eq!((method, path.as_str()), (Method::DELETE, "/api_keys/1234"));

    let (method, path, query, _) = invoke(
        "get_consumption",
        json!({"from": "2026-01-01T00:00:00Z", "to": "2026-02-01T00:00:00Z"}),
    )
    .await;
    assert_eq!((method, path.as_str()), (Method::GET, "/consumption_history/projects"));
    assert_eq!(query.len(), 2);
}

#[tokio::test]
async fn project_functions() {
    let (method, path, _, body) = invoke("create_project", json!({"project_name": "demo"})).await;
    assert_eq!((method, path.as_str()), (Method::POST, "/projects"));
    assert_eq!(
        body,
        Some(json!({"project": {"name": "demo", "pg_version": 17, "region_id": "azure-eastus2"}}))
    );

    let (method, path, _, body) = invoke(
        "update_project",
        json!({"project_id": "p1", "project": {"name": "renamed"}}),
    )
    .await;
    assert_eq!((method, path.as_str()), (Method::PATCH, "/projects/p1"));
    assert_eq!(body, Some(json!({"project": {"name": "renamed"}})));

    let (method, path, _, body) = invoke(
        "grant_project_permissions",
        json!({"project_id": "p1", "email": "dev@example.com"}),
    )
    .await;
    assert_eq!((method, path.as_str()), (Method::POST, "/projects/p1/permissions"));
    assert_eq!(body, Some(json!({"email": "dev@example.com"})));

    let (method, path, _, _) = invoke(
        "revoke_project_permissions",
        json!({"project_id": "p1", "permission_id": "perm-9"}),
    )
    .await;
    assert_eq!(
        (method, path.as_str()),
        (Method::DELETE, "/projects/p1/permissions/perm-9")
    );
}

#[tokio::test]
async fn branch_database_and_role_functions() {
    let (method, path, _, body) = invoke(
        "create_branch",
        json!({"project_id": "p1", "branch_name": "dev"}),
    )
    .await;
    assert_eq!((method, path.as_str()), (Method::POST, "/projects/p1/branches"));
    assert_eq!(body, Some(json!({"branch": {"name": "dev"}})));

    let (method, path, _, _) = invoke(
        "set_primary_branch",
        json!({"project_id": "p1", "branch_id": "br-1"}),
    )
    .await;
    assert_eq!(
        (method, path.as_str()),
        (Method::POST, "/projects/p1/branches/br-1/set_as_primary")
    );

    let (method, path, _, body) = invoke(
        "create_database",
        json!({"project_id": "p1", "branch_id": "br-1", "database_name": "app", "owner_name": "owner"}),
    )
    .await;
    assert_eq!(
        (method, path.as_str()),
        (Method::POST, "/projects/p1/branches/br-1/databases")
    );
    assert_eq!(body, Some(json!({"database": {"name": "app", "owner_name": "owner"}})));

    let (method, path, _, _) = invoke(
        "delete_database",
        json!({"project_id": "p1", "branch_id": "br-1", "database_name": "app"}),
    )
    .await;
    assert_eq!(
        (method, path.as_str()),
        (Method::DELETE, "/projects/p1/branches/br-1/databases/app")
    );

    let (method, path, _, _) = invoke(
        "reveal_role_password",
        json!({"project_id": "p1", "branch_id": "br-1", "role_name": "app"}),
    )
    .await;
    assert_eq!(
        (method, path.as_str()),
        (Method::GET, "/projects/p1/branches/br-1/roles/app/reveal_password")
    );
}

#[tokio::test]
async fn endpoint_and_operation_functions() {
    let (method, path, _, body) = invoke(
        "update_endpoint",
        json!({"project_id": "p1", "endpoint_id": "ep-1", "endpoint": {"autoscaling_limit_max_cu": 2}}),
    )
    .await;
    assert_eq!((method, path.as_str()), (Method::PATCH, "/projects/p1/endpoints/ep-1"));
    assert_eq!(body, Some(json!({"endpoint": {"autoscaling_limit_max_cu": 2}})));

    let (method, path, _, _) = invoke(
        "suspend_endpoint",
        json!({"project_id": "p1", "endpoint_id": "ep-1"}),
    )
    .await;
    assert_eq!(
        (method, path.as_str()),
        (Method::POST, "/projects/p1/endpoints/ep-1/suspend")
    );

    let (method, path, _, _) = invoke(
        "get_operation",
        json!({"project_id": "p1", "operation_id": "op-7"}),
    )
    .await;
    assert_eq!((method, path.as_str()), (Method::GET, "/projects/p1/operations/op-7"));
}

#[tokio::test]
async fn missing_required_argument_never_reaches_backend() {
    let neon = Arc::new(RecordingNeon::new());
    let mut registry = FunctionRegistry::new();
    register_neon_functions(&mut registry, neon.clone(), ProjectDefaults::default())
        .expect("register catalogue");
    let tools = registry.active_subset(["delete_branch"]).expect("subset");

    let err = tools
        .invoke("delete_branch", json!({"project_id": "p1"}))
        .await
        .expect_err("branch_id missing");

    assert!(matches!(err, ToolError::Validation { .. }));
    assert!(neon.calls().await.is_empty());
}

#[tokio::test]
async fn unknown_argument_is_rejected() {
    let neon = Arc::new(RecordingNeon::new());
    let mut registry = FunctionRegistry::new();
    register_neon_functions(&mut registry, neon.clone(), ProjectDefaults::default())
        .expect("register catalogue");
    let tools = registry.active_subset(["list_projects"]).expect("subset");

    let err = tools
        .invoke("list_projects", json!({"org_id": "org-1"}))
        .await
        .expect_err("unexpected argument");

    assert!(matches!(err, ToolError::Validation { .. }));
    assert!(neon.calls().await.is_empty());
}
