// Formatter tests - confirmation strings shown after successful steps.

use neon_agent_core::domain::ApiResult;
use neon_agent_core::formatter::{GENERIC_SUCCESS, format, format_value};
use serde_json::json;

#[test]
fn project_confirmation_matches_literal() {
    let payload = json!({
        "project": {"name": "demo", "id": "p-1", "region_id": "azure-eastus2", "pg_version": 17}
    });
    assert_eq!(
        format_value(&payload),
        "✅ Project 'demo' (ID: p-1) created successfully in 'azure-eastus2' with PostgreSQL v17."
    );
}

#[test]
fn missing_fields_fall_back_to_placeholders() {
    assert_eq!(
        format_value(&json!({"project": {}})),
        "✅ Project 'Unknown' (ID: N/A) created successfully in 'N/A' with PostgreSQL vN/A."
    );
    assert_eq!(
        format_value(&json!({"database": {"name": "app"}})),
        "✅ Database 'app' (ID: N/A) created successfully."
    );
    assert_eq!(
        format_value(&json!({"role": {}})),
        "✅ Role 'Unknown' created successfully."
    );
}

#[test]
fn key_priority_prefers_project_over_branch() {
    let payload = json!({
        "branch": {"name": "main", "id": "br-1"},
        "project": {"name": "demo", "id": "p-1", "region_id": "r", "pg_version": 16}
    });
    assert!(format_value(&payload).starts_with("✅ Project 'demo'"));
}

#[test]
fn empty_or_unrecognised_payloads_are_generic() {
    assert_eq!(format_value(&json!({})), GENERIC_SUCCESS);
    assert_eq!(format_value(&json!({"project": "not an object"})), GENERIC_SUCCESS);
    assert_eq!(format_value(&json!([1, 2, 3])), GENERIC_SUCCESS);
    assert_eq!(format(&ApiResult::from_value(json!(null))), GENERIC_SUCCESS);
}
