//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod connection;
pub mod context;
pub mod error;
pub mod health;
pub mod pipeline;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post, put},
};
use tower_http::trace::TraceLayer;

use crate::service::connection::ConnectionOrchestrator;
use crate::service::pipeline::PipelineService;
use crate::workflow::WorkflowDispatcher;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipelines: Arc<PipelineService>,
    pub connections: Arc<ConnectionOrchestrator>,
    pub workflows: Arc<dyn WorkflowDispatcher>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route(
            "/pipelines",
            post(pipeline::create_pipeline).get(pipeline::list_pipelines),
        )
        .route(
            "/pipelines/{id}",
            get(pipeline::get_pipeline)
                .put(pipeline::update_pipeline)
                .delete(pipeline::delete_pipeline),
        )
        // Connection endpoints
        .route("/pipelines/connections", post(connection::create_connection))
        .route(
            "/pipelines/connections/{id}",
            put(connection::update_connection),
        )
        .route(
            "/pipelines/connections/{id}/sync",
            post(connection::trigger_sync),
        )
        .route(
            "/pipelines/connections/{id}/sync/history",
            get(connection::sync_history),
        )
        .route(
            "/pipelines/connections/{id}/schema",
            get(connection::connection_schema),
        )
        .route(
            "/pipelines/connections/sync/logs/{job_id}",
            get(connection::job_logs),
        )
        // Internal endpoints
        .route(
            "/pipelines/internal/connections",
            get(connection::list_connections).post(connection::create_connection_direct),
        )
        .route(
            "/pipelines/internal/connections/{id}",
            put(connection::update_connection_direct),
        )
        .route(
            "/pipelines/internal/{id}",
            patch(pipeline::update_pipeline_status).delete(pipeline::delete_pipeline_row),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
