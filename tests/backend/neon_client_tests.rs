// Neon client tests - real HTTP against a local axum stand-in for the
// management API.

#[path = "../common/mod.rs"]
mod common;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use neon_agent_core::domain::ApiResult;
use neon_agent_core::neon::{ApiCall, BackendError, BackendErrorKind, NeonApi, NeonClient};
use serde_json::{Value, json};

async fn create_project(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer neon-key");
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": "", "message": "invalid API key"})),
        );
    }
    let project = &body["project"];
    (
        StatusCode::CREATED,
        Json(json!({
            "project": {
                "id": "silent-sun-123",
                "name": project["name"],
                "region_id": project["region_id"],
                "pg_version": project["pg_version"],
            },
            "operations": []
        })),
    )
}

async fn missing_project(Path(project_id): Path<String>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"code": "", "message": format!("project {project_id} not found")})),
    )
}

async fn get_role(
    Path((_project, _branch, role_name)): Path<(String, String, String)>,
) -> Json<Value> {
    Json(json!({"role": {"name": role_name, "protected": false}}))
}

async fn delete_key() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn neon_stub() -> String {
    let router = Router::new()
        .route("/api/v2/projects", post(create_project))
        .route("/api/v2/projects/{project_id}", get(missing_project))
        .route(
            "/api/v2/projects/{project_id}/branches/{branch_id}/roles/{role_name}",
            get(get_role),
        )
        .route("/api/v2/api_keys/{key_id}", delete(delete_key));
    let base = common::serve(router).await;
    format!("{base}/api/v2")
}

#[tokio::test]
async fn creates_project_with_bearer_key() {
    let client = NeonClient::new(neon_stub().await, Some("neon-key".into()));
    let call = ApiCall::post(["projects"]).with_body(json!({
        "project": {"name": "demo", "region_id": "azure-eastus2", "pg_version": 17}
    }));

    let result = client.send(call).await.expect("create succeeds");

    match result {
        ApiResult::Project(project) => {
            assert_eq!(project.name.as_deref(), Some("demo"));
            assert_eq!(project.id.as_deref(), Some("silent-sun-123"));
            assert_eq!(project.region_id.as_deref(), Some("azure-eastus2"));
            assert_eq!(project.pg_version.as_deref(), Some("17"));
        }
        other => panic!("expected project result, got {other:?}"),
    }
}

#[tokio::test]
async fn wrong_key_maps_to_permission_denied() {
    let client = NeonClient::new(neon_stub().await, Some("other-key".into()));

    let err = client
        .send(ApiCall::post(["projects"]).with_body(json!({"project": {"name": "demo"}})))
        .await
        .expect_err("unauthorized");

    assert_eq!(err.kind(), BackendErrorKind::PermissionDenied);
    assert!(err.to_string().contains("invalid API key"));
}

#[tokio::test]
async fn not_found_carries_neon_message() {
    let client = NeonClient::new(neon_stub().await, Some("neon-key".into()));

    let err = client
        .send(ApiCall::get(["projects", "p-missing"]))
        .await
        .expect_err("missing project");

    match err {
        BackendError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "project p-missing not found");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn path_segments_are_encoded_and_decoded_intact() {
    let client = NeonClient::new(neon_stub().await, Some("neon-key".into()));

    let result = client
        .send(ApiCall::get([
            "projects", "p1", "branches", "br-main", "roles", "app user",
        ]))
        .await
        .expect("role fetched");

    match result {
        ApiResult::Role(role) => assert_eq!(role.name.as_deref(), Some("app user")),
        other => panic!("expected role result, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_response_body_is_generic_success() {
    let client = NeonClient::new(neon_stub().await, Some("neon-key".into()));

    let result = client
        .send(ApiCall::delete(["api_keys", "42"]))
        .await
        .expect("delete succeeds");

    assert!(matches!(result, ApiResult::Generic { payload: Value::Null }));
}

#[tokio::test]
async fn unreachable_host_is_transient() {
    let client = NeonClient::new("http://127.0.0.1:1/api/v2", Some("neon-key".into()));

    let err = client
        .send(ApiCall::get(["projects"]))
        .await
        .expect_err("connection refused");

    assert!(matches!(err, BackendError::Network { .. }));
    assert_eq!(err.kind(), BackendErrorKind::Transient);
}
