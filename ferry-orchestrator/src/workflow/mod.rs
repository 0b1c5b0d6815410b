//! Workflow Module
//!
//! Connection lifecycle operations that may outlive the request which asked
//! for them. A dispatcher accepts a serializable [`WorkflowOperation`], runs it
//! out of band and hands back a [`WorkflowHandle`] that can be awaited.
//!
//! Every operation ends up in the same [`ConnectionOrchestrator`] calls the
//! direct endpoints use, so the persisted outcome does not depend on the path.

mod local;

pub use local::LocalWorkflowEngine;

use async_trait::async_trait;
use ferry_client::types::RemoteConnection;
use ferry_core::domain::connection::ConnectionRefs;
use ferry_core::domain::identity::Actor;
use ferry_core::dto::connection::{CreateConnectionRequest, UpdateConnectionRequest};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::service::connection::{ConnectionError, ConnectionOrchestrator};

/// A unit of work the dispatcher can run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkflowOperation {
    DeletePipeline {
        pipeline_id: Uuid,
    },
    CreateConnection {
        actor: Actor,
        request: CreateConnectionRequest,
    },
    UpdateConnection {
        actor: Actor,
        connection_id: Uuid,
        request: UpdateConnectionRequest,
    },
}

impl WorkflowOperation {
    /// Stable operation name, matches the serialized tag
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowOperation::DeletePipeline { .. } => "delete-pipeline",
            WorkflowOperation::CreateConnection { .. } => "create-connection",
            WorkflowOperation::UpdateConnection { .. } => "update-connection",
        }
    }

    /// Run the operation to completion against the orchestrator
    pub async fn execute(
        self,
        orchestrator: &ConnectionOrchestrator,
    ) -> Result<WorkflowOutput, ConnectionError> {
        match self {
            WorkflowOperation::DeletePipeline { pipeline_id } => {
                orchestrator.delete_pipeline(pipeline_id).await?;
                Ok(WorkflowOutput::PipelineDeleted)
            }
            WorkflowOperation::CreateConnection { actor, request } => orchestrator
                .create_connection(&actor, request)
                .await
                .map(WorkflowOutput::ConnectionCreated),
            WorkflowOperation::UpdateConnection {
                actor,
                connection_id,
                request,
            } => orchestrator
                .update_connection(&actor, connection_id, request)
                .await
                .map(WorkflowOutput::ConnectionUpdated),
        }
    }
}

/// Reference to a dispatched run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowHandle {
    pub run_id: Uuid,
    pub operation: String,
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutput {
    PipelineDeleted,
    ConnectionCreated(ConnectionRefs),
    ConnectionUpdated(RemoteConnection),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow dispatch failed: {0}")]
    Dispatch(String),

    #[error("unknown workflow run {0}")]
    UnknownRun(Uuid),

    #[error("workflow run {0} did not finish in time")]
    TimedOut(Uuid),

    /// The operation itself failed; keeps the upstream message intact
    #[error(transparent)]
    Operation(#[from] ConnectionError),
}

/// Runs workflow operations out of band
#[async_trait]
pub trait WorkflowDispatcher: Send + Sync {
    /// Start an operation and return without waiting for it
    async fn dispatch(&self, operation: WorkflowOperation) -> Result<WorkflowHandle, WorkflowError>;

    /// Wait for a dispatched run and take its result
    ///
    /// A run's result can be taken once; later calls return `UnknownRun`.
    async fn await_result(&self, handle: &WorkflowHandle) -> Result<WorkflowOutput, WorkflowError>;
}
