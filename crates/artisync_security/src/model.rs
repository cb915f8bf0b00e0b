//! Definition file formats.

use serde::{Deserialize, Serialize};

/// Artifact type of role definitions.
pub const ROLE_TYPE: &str = "role";

/// Artifact type of access constraints.
pub const ACCESS_TYPE: &str = "access";

/// Extension of role definition files.
pub const ROLE_EXTENSION: &str = "roles";

/// Extension of access definition files.
pub const ACCESS_EXTENSION: &str = "access";

/// One role in a `.roles` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// One constraint in an `.access` file.
///
/// ```json
/// [{"scope": "HTTP", "path": "/orders/*", "method": "GET", "roles": ["admin"]}]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDefinition {
    /// Constraint name; defaults to `{path}:{method}`.
    #[serde(default)]
    pub name: Option<String>,
    /// Protected scope.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Protected path. A trailing `*` matches any suffix.
    pub path: String,
    /// HTTP method, `*` for any.
    #[serde(default = "default_method")]
    pub method: String,
    /// Roles granted access.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

fn default_scope() -> String {
    "HTTP".to_string()
}

fn default_method() -> String {
    "*".to_string()
}

impl AccessDefinition {
    /// Effective constraint name.
    pub fn effective_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.path, self.method))
    }
}
