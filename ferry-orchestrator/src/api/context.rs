//! Request principal extraction
//!
//! The authentication proxy in front of the orchestrator resolves the caller
//! and forwards who they are as headers. Handlers take a [`RequestActor`]
//! instead of reading headers themselves.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ferry_core::domain::identity::Actor;

use crate::api::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const WORKSPACE_ID_HEADER: &str = "x-workspace-id";
pub const ECS_WORKSPACE_ID_HEADER: &str = "x-ecs-workspace-id";

/// The [`Actor`] a request was made by
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = required_id(parts, USER_ID_HEADER)?;
        let workspace_id = required_id(parts, WORKSPACE_ID_HEADER)?;
        let remote_workspace_id = header(parts, ECS_WORKSPACE_ID_HEADER)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(RequestActor(Actor {
            user_id,
            workspace_id,
            remote_workspace_id,
        }))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

fn required_id(parts: &Parts, name: &str) -> Result<i64, ApiError> {
    let value =
        header(parts, name).ok_or_else(|| ApiError::BadRequest(format!("missing {} header", name)))?;

    value
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {} header: {}", name, value)))
}
