//! Connection domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local record pairing a pipeline with its remote execution resource
///
/// The row is pre-allocated together with its pipeline, so it
/// exists before the remote connection does. `remote_connection_id` is set
/// only once the remote create succeeded and the result was committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub remote_connection_id: Option<String>,
    pub remote_status: Option<String>,
    pub schedule_units: Option<i32>,
    pub schedule_time_unit: Option<String>,
    pub is_first_run: bool,
    pub owner: i64,
    pub workspace_id: i64,
    pub created_at: DateTime<Utc>,
    pub pending: Option<PendingRemote>,
}

impl Connection {
    /// The schedule currently recorded for this connection, if any
    pub fn schedule(&self) -> Option<Schedule> {
        match (self.schedule_units, &self.schedule_time_unit) {
            (Some(units), Some(time_unit)) => Some(Schedule {
                units,
                time_unit: time_unit.clone(),
            }),
            _ => None,
        }
    }
}

/// Provisional saga marker recorded before the remote create
///
/// A marker that outlives the saga means the remote side may hold a
/// connection the local row does not know about yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingRemote {
    pub since: DateTime<Utc>,
    pub destination_id: Uuid,
    pub remote_workspace_id: String,
    /// Set when the remote create succeeded but the commit did not
    pub remote_connection_id: Option<String>,
}

/// Sync schedule as understood by the execution service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub units: i32,
    pub time_unit: String,
}

/// Everything the saga needs to know about a source/destination pair
///
/// Produced by the read-only resolve step; resolving the same pair twice with
/// no intervening writes yields an equal value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRefs {
    pub connection_id: Uuid,
    pub pipeline_id: Uuid,
    pub pipeline_name: String,
    pub source_id: Uuid,
    pub remote_source_id: String,
    pub destination_id: Uuid,
    pub remote_destination_id: String,
}

/// Outcome of a successful remote create, ready to be committed locally
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionResult {
    pub connection_id: Uuid,
    pub destination_id: Uuid,
    pub remote_connection_id: String,
    pub remote_status: String,
    pub schedule: Option<Schedule>,
    pub owner: i64,
    pub workspace_id: i64,
}
