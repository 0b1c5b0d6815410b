//! Connection Service
//!
//! The create/update saga for remote connections, pipeline teardown, and
//! thin passthroughs to the execution service.
//!
//! The saga always mutates the execution service first and persists locally
//! second. When the local persist fails after a remote success the two sides
//! disagree in one known direction: the remote resource exists and the local
//! row does not reference it. That state is reported as
//! [`ConnectionError::UnrecordedRemote`] and left for the reconciler.

use std::sync::Arc;

use ferry_client::types::{
    CreateRemoteConnection, JobLogs, ManualSync, RemoteConnection, SyncHistory,
    UpdateRemoteConnection,
};
use ferry_client::{ClientError, ConnectorExecution};
use ferry_core::domain::connection::{Connection, ConnectionRefs, ConnectionResult};
use ferry_core::domain::identity::Actor;
use ferry_core::domain::pipeline::PipelineStatus;
use ferry_core::dto::connection::{CreateConnectionRequest, UpdateConnectionRequest};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::repository::MetadataStore;

/// Service error type
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("connection {0} has not been provisioned on the execution service")]
    NotProvisioned(Uuid),

    #[error(
        "connection {connection_id} is already provisioned as remote connection {remote_connection_id}"
    )]
    AlreadyProvisioned {
        connection_id: Uuid,
        remote_connection_id: String,
    },

    /// Another create holds the provisional marker, or its outcome is still
    /// unknown and waits for the reconciler
    #[error("connection {0} has a remote create in progress")]
    CreateInProgress(Uuid),

    /// Execution service rejected or failed the call; displays its message unchanged
    #[error("{}", .0.upstream_message())]
    Upstream(ClientError),

    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error(
        "remote connection {remote_connection_id} exists but could not be recorded on connection {connection_id}"
    )]
    UnrecordedRemote {
        connection_id: Uuid,
        remote_connection_id: String,
    },

    /// The remote update went through but the local schedule and status are stale
    #[error(
        "remote connection {remote_connection_id} was updated but connection {connection_id} still holds its previous schedule"
    )]
    ScheduleNotRecorded {
        connection_id: Uuid,
        remote_connection_id: String,
    },
}

impl From<ClientError> for ConnectionError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidRequest(msg) => ConnectionError::Validation(msg),
            other => ConnectionError::Upstream(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnectionError>;

/// Drives connection lifecycle operations against the store and the ECS
pub struct ConnectionOrchestrator {
    store: Arc<dyn MetadataStore>,
    ecs: Arc<dyn ConnectorExecution>,
}

impl ConnectionOrchestrator {
    pub fn new(store: Arc<dyn MetadataStore>, ecs: Arc<dyn ConnectorExecution>) -> Self {
        Self { store, ecs }
    }

    /// Look up the local and remote ids of a source/destination pair in the
    /// actor's workspace
    ///
    /// Read-only; calling it twice without intervening writes gives equal
    /// results.
    pub async fn resolve(
        &self,
        actor: &Actor,
        source_id: Uuid,
        destination_id: Uuid,
    ) -> Result<ConnectionRefs> {
        self.store
            .resolve_connection_refs(source_id, destination_id, actor.workspace_id)
            .await?
            .ok_or_else(|| {
                ConnectionError::NotFound(format!(
                    "source {} or destination {}",
                    source_id, destination_id
                ))
            })
    }

    /// Create the remote connection for a pipeline and record it locally
    pub async fn create_connection(
        &self,
        actor: &Actor,
        mut request: CreateConnectionRequest,
    ) -> Result<ConnectionRefs> {
        let refs = self
            .resolve(actor, request.source_id, request.destination_id)
            .await?;

        let remote_workspace_id = remote_workspace(actor)?;
        request.stamp_operations(remote_workspace_id);
        let payload = CreateRemoteConnection::new(&refs, &request)?;

        let connection = self
            .store
            .get_connection(refs.connection_id)
            .await?
            .ok_or_else(|| ConnectionError::NotFound(format!("connection {}", refs.connection_id)))?;
        if let Some(remote_connection_id) = connection.remote_connection_id {
            return Err(ConnectionError::AlreadyProvisioned {
                connection_id: refs.connection_id,
                remote_connection_id,
            });
        }
        if connection.pending.is_some() {
            return Err(ConnectionError::CreateInProgress(refs.connection_id));
        }

        // Claims the row; a concurrent create that got here first wins
        let marked = self
            .store
            .mark_connection_pending(refs.connection_id, refs.destination_id, remote_workspace_id)
            .await?;
        if !marked {
            return Err(ConnectionError::CreateInProgress(refs.connection_id));
        }

        let remote = match self.ecs.create_connection(&payload).await {
            Ok(remote) => remote,
            Err(err) => {
                warn!(
                    connection_id = %refs.connection_id,
                    "remote connection create failed: {}", err
                );
                // A status code means the service answered and created nothing.
                // Transport failures keep the marker for the reconciler.
                if matches!(err, ClientError::ApiError { .. }) {
                    if let Err(e) = self.store.clear_connection_pending(refs.connection_id).await {
                        warn!(connection_id = %refs.connection_id, "failed to clear pending marker: {}", e);
                    }
                }
                return Err(ConnectionError::Upstream(err));
            }
        };

        let result = ConnectionResult {
            connection_id: refs.connection_id,
            destination_id: refs.destination_id,
            remote_connection_id: remote.connection_id.clone(),
            remote_status: remote.status.clone(),
            schedule: remote.schedule.clone(),
            owner: actor.user_id,
            workspace_id: actor.workspace_id,
        };

        match self.store.commit_connection_result(&result).await {
            Ok(true) => {
                info!(
                    "Connection created: {} -> remote {}",
                    refs.connection_id, remote.connection_id
                );
                Ok(refs)
            }
            Ok(false) => Err(self
                .unrecorded(refs.connection_id, remote.connection_id, "row vanished")
                .await),
            Err(e) => Err(self
                .unrecorded(refs.connection_id, remote.connection_id, &e.to_string())
                .await),
        }
    }

    async fn unrecorded(
        &self,
        connection_id: Uuid,
        remote_connection_id: String,
        cause: &str,
    ) -> ConnectionError {
        error!(
            %connection_id,
            remote_connection_id = %remote_connection_id,
            "remote connection created but not persisted: {}", cause
        );

        if let Err(e) = self
            .store
            .record_unrecorded_remote(connection_id, &remote_connection_id)
            .await
        {
            error!(%connection_id, "failed to record remote id for reconciliation: {}", e);
        }

        ConnectionError::UnrecordedRemote {
            connection_id,
            remote_connection_id,
        }
    }

    /// Alter an existing remote connection and record the schedule it now has
    pub async fn update_connection(
        &self,
        actor: &Actor,
        connection_id: Uuid,
        mut request: UpdateConnectionRequest,
    ) -> Result<RemoteConnection> {
        let connection = self
            .store
            .get_connection(connection_id)
            .await?
            .filter(|c| c.workspace_id == actor.workspace_id)
            .ok_or_else(|| ConnectionError::NotFound(format!("connection {}", connection_id)))?;

        let remote_connection_id = connection
            .remote_connection_id
            .ok_or(ConnectionError::NotProvisioned(connection_id))?;

        if !request.operations.is_empty() {
            request.stamp_operations(remote_workspace(actor)?);
        }
        let payload = UpdateRemoteConnection::new(&remote_connection_id, &request)?;

        let remote = self
            .ecs
            .update_connection(&payload)
            .await
            .map_err(ConnectionError::Upstream)?;

        let cause = match self
            .store
            .update_connection_schedule(connection_id, remote.schedule.as_ref(), &remote.status)
            .await
        {
            Ok(true) => {
                info!("Connection updated: {}", connection_id);
                return Ok(remote);
            }
            Ok(false) => "row vanished".to_string(),
            Err(e) => e.to_string(),
        };

        error!(
            %connection_id,
            "remote connection {} updated but schedule not persisted: {}",
            remote_connection_id, cause
        );
        Err(ConnectionError::ScheduleNotRecorded {
            connection_id,
            remote_connection_id,
        })
    }

    /// Tear down a pipeline: remote connection first, then the local rows
    pub async fn delete_pipeline(&self, pipeline_id: Uuid) -> Result<()> {
        let updated = self
            .store
            .update_pipeline_status(pipeline_id, PipelineStatus::DeletionInProgress)
            .await?;
        if !updated {
            return Err(ConnectionError::NotFound(format!("pipeline {}", pipeline_id)));
        }

        let remote_connection_id = self
            .store
            .get_pipeline_connection(pipeline_id)
            .await?
            .and_then(|c| c.remote_connection_id);

        if let Some(remote_id) = remote_connection_id {
            match self.ecs.delete_connection(&remote_id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    warn!("remote connection {} already gone", remote_id);
                }
                Err(e) => {
                    self.store
                        .update_pipeline_status(pipeline_id, PipelineStatus::Active)
                        .await?;
                    return Err(ConnectionError::Upstream(e));
                }
            }
        }

        self.store.delete_pipeline(pipeline_id).await?;
        info!("Pipeline deleted: {}", pipeline_id);

        Ok(())
    }

    /// All connection rows, unfiltered
    pub async fn list_connections(&self) -> Result<Vec<Connection>> {
        Ok(self.store.list_connections().await?)
    }

    // =========================================================================
    // Execution service passthroughs
    // =========================================================================

    pub async fn trigger_sync(&self, remote_connection_id: &str) -> Result<ManualSync> {
        self.ecs
            .trigger_sync(remote_connection_id)
            .await
            .map_err(ConnectionError::Upstream)
    }

    pub async fn sync_history(&self, remote_connection_id: &str) -> Result<SyncHistory> {
        self.ecs
            .fetch_sync_history(remote_connection_id)
            .await
            .map_err(ConnectionError::Upstream)
    }

    pub async fn job_logs(&self, job_id: i64) -> Result<JobLogs> {
        self.ecs
            .get_job_logs(job_id)
            .await
            .map_err(ConnectionError::Upstream)
    }

    pub async fn connection_schema(&self, remote_connection_id: &str) -> Result<RemoteConnection> {
        self.ecs
            .get_connection_schema(remote_connection_id)
            .await
            .map_err(ConnectionError::Upstream)
    }
}

fn remote_workspace(actor: &Actor) -> Result<&str> {
    actor
        .remote_workspace_id
        .as_deref()
        .filter(|ws| !ws.trim().is_empty())
        .ok_or_else(|| ConnectionError::Validation("missing execution workspace id".to_string()))
}
