use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Closed set of backend results. Each named variant keeps the raw response so
/// the model still sees every field the API returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiResult {
    Project(ProjectResult),
    Branch(BranchResult),
    Database(DatabaseResult),
    Role(RoleResult),
    Generic { payload: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectResult {
    pub name: Option<String>,
    pub id: Option<String>,
    pub region_id: Option<String>,
    pub pg_version: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchResult {
    pub name: Option<String>,
    pub id: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseResult {
    pub name: Option<String>,
    pub id: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleResult {
    pub name: Option<String>,
    pub payload: Value,
}

impl ApiResult {
    /// Classifies a raw response by its first known top-level key
    /// (`project`, `branch`, `database`, `role`, in that order).
    pub fn from_value(payload: Value) -> Self {
        let Some(root) = payload.as_object() else {
            return ApiResult::Generic { payload };
        };

        if let Some(entry) = root.get("project") {
            return match entry.as_object() {
                Some(project) => ApiResult::Project(ProjectResult {
                    name: text_field(project, "name"),
                    id: text_field(project, "id"),
                    region_id: text_field(project, "region_id"),
                    pg_version: text_field(project, "pg_version"),
                    payload,
                }),
                None => ApiResult::Generic { payload },
            };
        }

        if let Some(entry) = root.get("branch") {
            return match entry.as_object() {
                Some(branch) => ApiResult::Branch(BranchResult {
                    name: text_field(branch, "name"),
                    id: text_field(branch, "id"),
                    payload,
                }),
                None => ApiResult::Generic { payload },
            };
        }

        if let Some(entry) = root.get("database") {
            return match entry.as_object() {
                Some(database) => ApiResult::Database(DatabaseResult {
                    name: text_field(database, "name"),
                    id: text_field(database, "id"),
                    payload,
                }),
                None => ApiResult::Generic { payload },
            };
        }

        if let Some(entry) = root.get("role") {
            return match entry.as_object() {
                Some(role) => ApiResult::Role(RoleResult {
                    name: text_field(role, "name"),
                    payload,
                }),
                None => ApiResult::Generic { payload },
            };
        }

        ApiResult::Generic { payload }
    }

    pub fn payload(&self) -> &Value {
        match self {
            ApiResult::Project(result) => &result.payload,
            ApiResult::Branch(result) => &result.payload,
            ApiResult::Database(result) => &result.payload,
            ApiResult::Role(result) => &result.payload,
            ApiResult::Generic { payload } => payload,
        }
    }
}

impl From<Value> for ApiResult {
    fn from(value: Value) -> Self {
        ApiResult::from_value(value)
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
