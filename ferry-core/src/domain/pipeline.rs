//! Pipeline domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::IdentitySummary;

/// Pipeline definition
///
/// A user-facing grouping that a connection executes against. Owned by the
/// metadata store; the orchestrator only reads and transitions it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    pub governance: Vec<String>,
    pub status: PipelineStatus,
    pub owner: i64,
    pub workspace_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Pipeline lifecycle status
///
/// `Active` -> `DeletionInProgress` -> `Deleted`. A teardown that fails before
/// the row is gone may return the pipeline to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    Active,
    DeletionInProgress,
    Deleted,
}

impl PipelineStatus {
    /// Stable string stored in the `pipelines.status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Active => "Active",
            PipelineStatus::DeletionInProgress => "Deletion In-Progress",
            PipelineStatus::Deleted => "Deleted",
        }
    }

    /// Whether moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: PipelineStatus) -> bool {
        matches!(
            (self, next),
            (PipelineStatus::Active, PipelineStatus::DeletionInProgress)
                | (PipelineStatus::DeletionInProgress, PipelineStatus::Deleted)
                | (PipelineStatus::DeletionInProgress, PipelineStatus::Active)
        ) || *self == next
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PipelineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" | "active" => Ok(PipelineStatus::Active),
            "Deletion In-Progress" | "deletion_in_progress" => {
                Ok(PipelineStatus::DeletionInProgress)
            }
            "Deleted" | "deleted" => Ok(PipelineStatus::Deleted),
            other => Err(format!("unknown pipeline status: {}", other)),
        }
    }
}

/// One row of the pipeline list, enriched in memory
///
/// `status`, `last_run` and `owner` are never read from the store. They are
/// filled by enrichment and stay empty when a remote lookup fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetadata {
    pub pipeline_id: Uuid,
    pub pipeline_name: String,
    pub pipeline_governance: Vec<String>,
    pub pipeline_status: String,
    pub source_id: Option<Uuid>,
    pub source_name: Option<String>,
    pub destination_id: Option<Uuid>,
    pub destination_name: Option<String>,
    pub connection_id: Option<Uuid>,
    pub remote_connection_id: Option<String>,
    #[serde(skip)]
    pub owner_id: i64,

    pub status: Option<String>,
    pub last_run: Option<i64>,
    pub owner: Option<IdentitySummary>,
}

/// Detail view of a single pipeline
///
/// Same enrichment fields as [`PipelineMetadata`], but produced by the
/// hard-failing detail path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDetail {
    pub pipeline_id: Uuid,
    pub name: String,
    pub governance: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub pipeline_status: String,
    pub source_id: Option<Uuid>,
    pub source_name: Option<String>,
    pub destination_id: Option<Uuid>,
    pub destination_name: Option<String>,
    pub connection_id: Option<Uuid>,
    pub remote_connection_id: Option<String>,
    #[serde(skip)]
    pub owner_id: i64,

    pub status: Option<String>,
    pub last_run: Option<i64>,
    pub owner: Option<IdentitySummary>,
}
