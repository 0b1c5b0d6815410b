//! Ferry HTTP Clients
//!
//! Typed clients for the two services the orchestrator depends on:
//! - the connector-execution service (ECS), which owns and runs connections
//! - the identity service, which resolves pipeline owners for display
//!
//! Both are exposed behind traits (`ConnectorExecution`, `IdentityLookup`) so
//! the orchestrator can be exercised against in-memory doubles.
//!
//! # Example
//!
//! ```no_run
//! use ferry_client::{ConnectorExecution, EcsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ecs = EcsClient::new("http://localhost:8000");
//!
//!     let meta = ecs.get_connection_details("c0ffee").await?;
//!     println!("last sync: {:?}", meta.latest_sync_job_status);
//!     Ok(())
//! }
//! ```

mod ecs;
pub mod error;
mod identity;
pub mod types;

pub use ecs::{ConnectorExecution, EcsClient};
pub use error::{ClientError, Result};
pub use identity::{IdentityClient, IdentityLookup};

use serde::de::DeserializeOwned;

// =============================================================================
// Response Handlers
// =============================================================================

/// Check the status code and deserialize the JSON body
///
/// The body of a non-success response is kept verbatim in the error.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle a response whose body is ignored (e.g. deletes)
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}

pub(crate) fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}
