//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use ferry_core::domain::identity::Actor;
use ferry_core::domain::pipeline::{Pipeline, PipelineDetail, PipelineMetadata, PipelineStatus};
use ferry_core::dto::pipeline::{CreatePipeline, UpdatePipeline};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::context::RequestActor;
use crate::api::error::{ApiError, ApiResult};
use crate::workflow::{WorkflowHandle, WorkflowOperation};

/// POST /pipelines
/// Create a new pipeline in the caller's workspace
pub async fn create_pipeline(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<CreatePipeline>,
) -> ApiResult<Json<Pipeline>> {
    tracing::info!("Creating pipeline: {}", req.name);

    let pipeline = state.pipelines.create_pipeline(&actor, req).await?;

    Ok(Json(pipeline))
}

/// GET /pipelines
/// List the workspace's pipelines with live status and owner
pub async fn list_pipelines(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> ApiResult<Json<Vec<PipelineMetadata>>> {
    tracing::debug!("Listing pipelines for workspace {}", actor.workspace_id);

    let pipelines = state.pipelines.list_pipelines(&actor).await?;

    Ok(Json(pipelines))
}

/// GET /pipelines/{id}
pub async fn get_pipeline(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineDetail>> {
    tracing::debug!("Getting pipeline: {}", id);

    let detail = state.pipelines.get_pipeline_detail(&actor, id).await?;

    Ok(Json(detail))
}

/// PUT /pipelines/{id}
pub async fn update_pipeline(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePipeline>,
) -> ApiResult<Json<Pipeline>> {
    tracing::info!("Updating pipeline: {}", id);

    owned_pipeline(&state, &actor, id).await?;
    let pipeline = state.pipelines.update_pipeline(id, req).await?;

    Ok(Json(pipeline))
}

/// DELETE /pipelines/{id}
/// Start the teardown workflow and return its handle without waiting
pub async fn delete_pipeline(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<WorkflowHandle>)> {
    tracing::info!("Deleting pipeline: {}", id);

    owned_pipeline(&state, &actor, id).await?;

    let handle = state
        .workflows
        .dispatch(WorkflowOperation::DeletePipeline { pipeline_id: id })
        .await?;

    let workflows = state.workflows.clone();
    let watched = handle.clone();
    tokio::spawn(async move {
        match workflows.await_result(&watched).await {
            Ok(_) => tracing::info!("Pipeline {} teardown finished", id),
            Err(e) => tracing::warn!("Pipeline {} teardown failed: {}", id, e),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(handle)))
}

// =============================================================================
// Internal Endpoints
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

/// PATCH /pipelines/internal/{id}?status=
pub async fn update_pipeline_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<StatusCode> {
    let status: PipelineStatus = query.status.parse().map_err(ApiError::BadRequest)?;

    state.pipelines.update_pipeline_status(id, status).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /pipelines/internal/{id}
/// Remove the pipeline row only
pub async fn delete_pipeline_row(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.pipelines.delete_pipeline(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Pipelines of another workspace are reported as missing
async fn owned_pipeline(state: &AppState, actor: &Actor, id: Uuid) -> ApiResult<Pipeline> {
    let pipeline = state.pipelines.get_pipeline(id).await?;

    if pipeline.workspace_id != actor.workspace_id {
        return Err(ApiError::NotFound(format!("Pipeline {} not found", id)));
    }

    Ok(pipeline)
}
