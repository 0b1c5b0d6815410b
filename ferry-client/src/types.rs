//! Execution-service wire types
//!
//! Request bodies are built through validating constructors so that a
//! malformed payload is rejected before anything is sent.

use serde::{Deserialize, Serialize};

use ferry_core::domain::connection::{ConnectionRefs, Schedule};
use ferry_core::dto::connection::{
    CreateConnectionRequest, Operation, SyncCatalog, UpdateConnectionRequest,
};

use crate::error::{ClientError, Result};

/// Namespace definition used for every connection we create
pub const NAMESPACE_DEFINITION: &str = "customformat";

/// Status given to newly created connections
pub const STATUS_ACTIVE: &str = "active";

/// Body of `web_backend/connections/create`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRemoteConnection {
    namespace_definition: String,
    namespace_format: String,
    prefix: String,
    source_id: String,
    destination_id: String,
    sync_catalog: SyncCatalog,
    schedule: Option<Schedule>,
    status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    operations: Vec<Operation>,
}

impl CreateRemoteConnection {
    /// Build the create payload for a resolved source/destination pair
    ///
    /// The namespace format is the pipeline name. Operations must already
    /// carry the remote workspace id.
    pub fn new(refs: &ConnectionRefs, request: &CreateConnectionRequest) -> Result<Self> {
        require("remote source id", &refs.remote_source_id)?;
        require("remote destination id", &refs.remote_destination_id)?;
        require("pipeline name", &refs.pipeline_name)?;
        validate_catalog(&request.sync_catalog)?;
        validate_operations(&request.operations)?;

        Ok(Self {
            namespace_definition: NAMESPACE_DEFINITION.to_string(),
            namespace_format: refs.pipeline_name.clone(),
            prefix: request.prefix.clone(),
            source_id: refs.remote_source_id.clone(),
            destination_id: refs.remote_destination_id.clone(),
            sync_catalog: request.sync_catalog.clone(),
            schedule: request.schedule.clone(),
            status: STATUS_ACTIVE.to_string(),
            operations: request.operations.clone(),
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }
}

/// Body of `web_backend/connections/update`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRemoteConnection {
    connection_id: String,
    prefix: String,
    sync_catalog: SyncCatalog,
    schedule: Option<Schedule>,
    status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    operations: Vec<Operation>,
}

impl UpdateRemoteConnection {
    pub fn new(remote_connection_id: &str, request: &UpdateConnectionRequest) -> Result<Self> {
        require("remote connection id", remote_connection_id)?;
        require("status", &request.status)?;
        validate_catalog(&request.sync_catalog)?;
        validate_operations(&request.operations)?;

        Ok(Self {
            connection_id: remote_connection_id.to_string(),
            prefix: request.prefix.clone(),
            sync_catalog: request.sync_catalog.clone(),
            schedule: request.schedule.clone(),
            status: request.status.clone(),
            operations: request.operations.clone(),
        })
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::InvalidRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn validate_catalog(catalog: &SyncCatalog) -> Result<()> {
    if catalog.streams.is_empty() {
        return Err(ClientError::InvalidRequest(
            "sync catalog must contain at least one stream".to_string(),
        ));
    }
    if let Some(entry) = catalog.streams.iter().find(|s| s.stream.name.is_empty()) {
        return Err(ClientError::InvalidRequest(format!(
            "stream with sync mode '{}' has no name",
            entry.config.sync_mode
        )));
    }
    Ok(())
}

fn validate_operations(operations: &[Operation]) -> Result<()> {
    if let Some(op) = operations.iter().find(|op| op.workspace_id.is_none()) {
        return Err(ClientError::InvalidRequest(format!(
            "operation '{}' has no workspace id",
            op.name
        )));
    }
    Ok(())
}

/// Connection as returned by the web backend create/update/get endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConnection {
    pub connection_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace_definition: String,
    #[serde(default)]
    pub namespace_format: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub destination_id: String,
    #[serde(default)]
    pub sync_catalog: SyncCatalog,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    pub status: String,
    #[serde(default)]
    pub operation_ids: Vec<String>,
    #[serde(default)]
    pub source: Option<serde_json::Value>,
    #[serde(default)]
    pub destination: Option<serde_json::Value>,
}

/// Live status fields of a connection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMeta {
    #[serde(default)]
    pub latest_sync_job_created_at: Option<i64>,
    #[serde(default)]
    pub latest_sync_job_status: Option<String>,
}

/// Entry of `connections/list`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConnectionSummary {
    pub connection_id: String,
    pub source_id: String,
    pub destination_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConnectionList {
    #[serde(default)]
    pub connections: Vec<RemoteConnectionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncJob {
    pub id: i64,
    #[serde(default)]
    pub config_type: String,
    #[serde(default)]
    pub config_id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    pub status: String,
}

/// Response of `connections/sync`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualSync {
    pub job: SyncJob,
    #[serde(default)]
    pub attempts: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncAttempt {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub ended_at: Option<i64>,
    #[serde(default)]
    pub bytes_synced: Option<i64>,
    #[serde(default)]
    pub records_synced: Option<i64>,
    #[serde(default)]
    pub total_stats: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistoryEntry {
    pub job: SyncJob,
    #[serde(default)]
    pub attempts: Vec<SyncAttempt>,
}

/// Response of `jobs/list`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistory {
    #[serde(default)]
    pub jobs: Vec<SyncHistoryEntry>,
}

/// Job types included in a sync history request
pub const SYNC_HISTORY_CONFIG_TYPES: [&str; 2] = ["sync", "reset_connection"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SyncHistoryQuery {
    pub config_types: Vec<String>,
    pub config_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogLines {
    #[serde(default)]
    pub log_lines: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptLogs {
    #[serde(default)]
    pub logs: LogLines,
}

/// Response of `jobs/get`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobLogs {
    #[serde(default)]
    pub attempts: Vec<AttemptLogs>,
}

impl JobLogs {
    /// All log lines across attempts, oldest attempt first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.attempts
            .iter()
            .flat_map(|a| a.logs.log_lines.iter().map(String::as_str))
    }
}
