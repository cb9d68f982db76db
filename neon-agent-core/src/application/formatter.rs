//! Short confirmation strings for successful backend results.

use serde_json::Value;

use crate::domain::ApiResult;

pub const GENERIC_SUCCESS: &str = "✅ Action is completed successfully.";

const UNKNOWN: &str = "Unknown";
const NOT_AVAILABLE: &str = "N/A";

pub fn format(result: &ApiResult) -> String {
    match result {
        ApiResult::Project(project) => format!(
            "✅ Project '{}' (ID: {}) created successfully in '{}' with PostgreSQL v{}.",
            or_unknown(&project.name),
            or_na(&project.id),
            or_na(&project.region_id),
            or_na(&project.pg_version),
        ),
        ApiResult::Branch(branch) => format!(
            "✅ Branch '{}' (ID: {}) created successfully.",
            or_unknown(&branch.name),
            or_na(&branch.id),
        ),
        ApiResult::Database(database) => format!(
            "✅ Database '{}' (ID: {}) created successfully.",
            or_unknown(&database.name),
            or_na(&database.id),
        ),
        ApiResult::Role(role) => {
            format!("✅ Role '{}' created successfully.", or_unknown(&role.name))
        }
        ApiResult::Generic { .. } => GENERIC_SUCCESS.to_string(),
    }
}

/// Formats a raw JSON response by classifying it first.
pub fn format_value(payload: &Value) -> String {
    format(&ApiResult::from_value(payload.clone()))
}

fn or_unknown(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or(UNKNOWN)
}

fn or_na(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or(NOT_AVAILABLE)
}
