//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::service::connection::ConnectionError;
use crate::service::pipeline::PipelineError;
use crate::workflow::WorkflowError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// A remote service failed; the message is passed through as-is
    BadGateway(String),
    GatewayTimeout(String),
    DatabaseError(sqlx::Error),
    InternalError(String),
    /// Remote resource exists but the local record of it does not
    UnrecordedRemote {
        connection_id: Uuid,
        remote_connection_id: String,
    },
    /// Remote update applied, local schedule left behind
    ScheduleNotRecorded {
        connection_id: Uuid,
        remote_connection_id: String,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ApiError::UnrecordedRemote {
                connection_id,
                remote_connection_id,
            } => {
                let message = format!(
                    "Remote connection {} was created but not recorded",
                    remote_connection_id
                );
                return divergence(
                    "unrecorded_remote_resource",
                    message,
                    connection_id,
                    remote_connection_id,
                );
            }
            ApiError::ScheduleNotRecorded {
                connection_id,
                remote_connection_id,
            } => {
                let message = format!(
                    "Remote connection {} was updated but its schedule was not saved",
                    remote_connection_id
                );
                return divergence(
                    "schedule_not_recorded",
                    message,
                    connection_id,
                    remote_connection_id,
                );
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Body for states where the local row and the remote connection disagree
fn divergence(
    code: &str,
    message: String,
    connection_id: Uuid,
    remote_connection_id: String,
) -> Response {
    let body = serde_json::json!({
        "error": message,
        "code": code,
        "connectionId": connection_id,
        "remoteConnectionId": remote_connection_id,
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<ConnectionError> for ApiError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            ConnectionError::Validation(msg) => ApiError::BadRequest(msg),
            ConnectionError::NotProvisioned(_)
            | ConnectionError::AlreadyProvisioned { .. }
            | ConnectionError::CreateInProgress(_) => ApiError::Conflict(err.to_string()),
            ConnectionError::Upstream(_) => ApiError::BadGateway(err.to_string()),
            ConnectionError::Persistence(e) => ApiError::DatabaseError(e),
            ConnectionError::UnrecordedRemote {
                connection_id,
                remote_connection_id,
            } => ApiError::UnrecordedRemote {
                connection_id,
                remote_connection_id,
            },
            ConnectionError::ScheduleNotRecorded {
                connection_id,
                remote_connection_id,
            } => ApiError::ScheduleNotRecorded {
                connection_id,
                remote_connection_id,
            },
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(id) => ApiError::NotFound(format!("Pipeline {} not found", id)),
            PipelineError::ValidationError(msg) => ApiError::BadRequest(msg),
            PipelineError::NotProvisioned(_) => ApiError::Conflict(err.to_string()),
            PipelineError::Upstream(msg) => ApiError::BadGateway(msg),
            PipelineError::DatabaseError(e) => ApiError::DatabaseError(e),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Operation(inner) => inner.into(),
            WorkflowError::TimedOut(_) => ApiError::GatewayTimeout(err.to_string()),
            WorkflowError::UnknownRun(_) | WorkflowError::Dispatch(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
