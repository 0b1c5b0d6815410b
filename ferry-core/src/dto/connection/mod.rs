//! Connection DTOs
//!
//! Request bodies accepted by the orchestrator for connection create/update,
//! and the catalog/operation shapes that are forwarded to the execution
//! service unchanged.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::connection::Schedule;

/// Request to create the remote connection for a pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    pub source_id: Uuid,
    pub destination_id: Uuid,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    pub sync_catalog: SyncCatalog,
    pub prefix: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl CreateConnectionRequest {
    /// Stamp the remote workspace id onto every operation descriptor
    pub fn stamp_operations(&mut self, remote_workspace_id: &str) {
        stamp(&mut self.operations, remote_workspace_id);
    }
}

/// Request to alter an existing remote connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConnectionRequest {
    pub prefix: String,
    pub sync_catalog: SyncCatalog,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    pub status: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl UpdateConnectionRequest {
    /// Stamp the remote workspace id onto every operation descriptor
    pub fn stamp_operations(&mut self, remote_workspace_id: &str) {
        stamp(&mut self.operations, remote_workspace_id);
    }
}

fn stamp(operations: &mut [Operation], remote_workspace_id: &str) {
    for operation in operations.iter_mut() {
        operation.workspace_id = Some(remote_workspace_id.to_string());
    }
}

/// Stream selection for a connection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncCatalog {
    pub streams: Vec<CatalogEntry>,
}

impl SyncCatalog {
    /// Number of streams marked as selected
    pub fn selected_count(&self) -> usize {
        self.streams.iter().filter(|s| s.config.selected).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub stream: Stream,
    pub config: StreamConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub name: String,
    #[serde(default)]
    pub json_schema: serde_json::Value,
    #[serde(default)]
    pub supported_sync_modes: Vec<String>,
    #[serde(default)]
    pub source_defined_cursor: bool,
    #[serde(default)]
    pub default_cursor_field: Vec<String>,
    #[serde(default)]
    pub source_defined_primary_key: Vec<Vec<String>>,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamConfig {
    pub sync_mode: String,
    #[serde(default)]
    pub cursor_field: Vec<String>,
    pub destination_sync_mode: String,
    #[serde(default)]
    pub primary_key: Vec<Vec<String>>,
    #[serde(default)]
    pub alias_name: String,
    pub selected: bool,
}

/// Post-sync operation (normalization, dbt) attached to a connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Filled in by the orchestrator; callers never supply it
    #[serde(default)]
    pub workspace_id: Option<String>,
    pub name: String,
    pub operator_configuration: OperatorConfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfiguration {
    pub operator_type: String,
    #[serde(default)]
    pub normalization: Option<Normalization>,
    #[serde(default)]
    pub dbt: Option<Dbt>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Normalization {
    pub option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dbt {
    pub git_repo_url: String,
    #[serde(default)]
    pub git_repo_branch: Option<String>,
    #[serde(default)]
    pub docker_image: Option<String>,
    #[serde(default)]
    pub dbt_arguments: Option<String>,
}
