//! Identity domain types

use serde::{Deserialize, Serialize};

/// Display identity of a pipeline owner
///
/// Used for enrichment only, never for authorization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentitySummary {
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub workspace_id: Option<serde_json::Value>,
}

impl IdentitySummary {
    /// "First Last", falling back to the email when no name is known
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();

        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// The principal a request acts on behalf of
///
/// Populated by the API layer from headers set by the authentication
/// middleware in front of this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: i64,
    pub workspace_id: i64,
    /// Workspace id on the execution service side
    pub remote_workspace_id: Option<String>,
}
