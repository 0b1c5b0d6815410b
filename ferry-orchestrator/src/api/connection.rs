//! Connection API Handlers
//!
//! Create and update go through the workflow dispatcher; the internal routes
//! call the saga directly. Sync, history, logs and schema are passthroughs
//! to the execution service.

use axum::{
    Json,
    extract::{Path, State},
};
use ferry_client::types::{JobLogs, ManualSync, RemoteConnection, SyncHistory};
use ferry_core::domain::connection::{Connection, ConnectionRefs};
use ferry_core::dto::connection::{CreateConnectionRequest, UpdateConnectionRequest};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::context::RequestActor;
use crate::api::error::{ApiError, ApiResult};
use crate::workflow::{WorkflowOperation, WorkflowOutput};

// =============================================================================
// Workflow-routed Endpoints
// =============================================================================

/// POST /pipelines/connections
pub async fn create_connection(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<CreateConnectionRequest>,
) -> ApiResult<Json<ConnectionRefs>> {
    tracing::info!(
        "Creating connection: source {} -> destination {}",
        req.source_id,
        req.destination_id
    );

    let handle = state
        .workflows
        .dispatch(WorkflowOperation::CreateConnection {
            actor,
            request: req,
        })
        .await?;

    match state.workflows.await_result(&handle).await? {
        WorkflowOutput::ConnectionCreated(refs) => Ok(Json(refs)),
        other => Err(unexpected(&handle.operation, &other)),
    }
}

/// PUT /pipelines/connections/{id}
pub async fn update_connection(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateConnectionRequest>,
) -> ApiResult<Json<RemoteConnection>> {
    tracing::info!("Updating connection: {}", id);

    let handle = state
        .workflows
        .dispatch(WorkflowOperation::UpdateConnection {
            actor,
            connection_id: id,
            request: req,
        })
        .await?;

    match state.workflows.await_result(&handle).await? {
        WorkflowOutput::ConnectionUpdated(remote) => Ok(Json(remote)),
        other => Err(unexpected(&handle.operation, &other)),
    }
}

fn unexpected(operation: &str, output: &WorkflowOutput) -> ApiError {
    ApiError::InternalError(format!(
        "workflow {} returned unexpected output: {:?}",
        operation, output
    ))
}

// =============================================================================
// Execution Service Passthroughs
// =============================================================================

/// POST /pipelines/connections/{id}/sync
/// `id` is the execution service's connection id
pub async fn trigger_sync(
    State(state): State<AppState>,
    Path(remote_id): Path<String>,
) -> ApiResult<Json<ManualSync>> {
    tracing::info!("Triggering sync for remote connection {}", remote_id);

    Ok(Json(state.connections.trigger_sync(&remote_id).await?))
}

/// GET /pipelines/connections/{id}/sync/history
pub async fn sync_history(
    State(state): State<AppState>,
    Path(remote_id): Path<String>,
) -> ApiResult<Json<SyncHistory>> {
    Ok(Json(state.connections.sync_history(&remote_id).await?))
}

/// GET /pipelines/connections/{id}/schema
pub async fn connection_schema(
    State(state): State<AppState>,
    Path(remote_id): Path<String>,
) -> ApiResult<Json<RemoteConnection>> {
    Ok(Json(state.connections.connection_schema(&remote_id).await?))
}

/// GET /pipelines/connections/sync/logs/{job_id}
pub async fn job_logs(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> ApiResult<Json<JobLogs>> {
    Ok(Json(state.connections.job_logs(job_id).await?))
}

// =============================================================================
// Internal Endpoints
// =============================================================================

/// GET /pipelines/internal/connections
pub async fn list_connections(State(state): State<AppState>) -> ApiResult<Json<Vec<Connection>>> {
    tracing::debug!("Listing all connections");

    Ok(Json(state.connections.list_connections().await?))
}

/// POST /pipelines/internal/connections
pub async fn create_connection_direct(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<CreateConnectionRequest>,
) -> ApiResult<Json<ConnectionRefs>> {
    Ok(Json(state.connections.create_connection(&actor, req).await?))
}

/// PUT /pipelines/internal/connections/{id}
pub async fn update_connection_direct(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateConnectionRequest>,
) -> ApiResult<Json<RemoteConnection>> {
    Ok(Json(
        state.connections.update_connection(&actor, id, req).await?,
    ))
}
