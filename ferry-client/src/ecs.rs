//! Connector-execution service client
//!
//! All endpoints are `POST` with a JSON body under `/api/v1`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::Result;
use crate::types::{
    ConnectionList, ConnectionMeta, CreateRemoteConnection, JobLogs, ManualSync,
    RemoteConnection, RemoteConnectionSummary, SYNC_HISTORY_CONFIG_TYPES, SyncHistory,
    SyncHistoryQuery, UpdateRemoteConnection,
};
use crate::{handle_empty_response, handle_response, trim_base_url};

/// Operations the orchestrator needs from the execution service
#[async_trait]
pub trait ConnectorExecution: Send + Sync {
    /// Creates a connection between an existing remote source and destination
    async fn create_connection(&self, req: &CreateRemoteConnection) -> Result<RemoteConnection>;

    /// Replaces catalog, schedule, prefix, status and operations of a connection
    async fn update_connection(&self, req: &UpdateRemoteConnection) -> Result<RemoteConnection>;

    /// Fetches the latest sync status and timestamp of a connection
    async fn get_connection_details(&self, remote_connection_id: &str) -> Result<ConnectionMeta>;

    /// Deletes a connection
    async fn delete_connection(&self, remote_connection_id: &str) -> Result<()>;

    /// Lists every connection of a remote workspace
    async fn list_connections(
        &self,
        remote_workspace_id: &str,
    ) -> Result<Vec<RemoteConnectionSummary>>;

    /// Starts a sync outside the connection's schedule
    async fn trigger_sync(&self, remote_connection_id: &str) -> Result<ManualSync>;

    /// Fetches the sync and reset jobs of a connection
    async fn fetch_sync_history(&self, remote_connection_id: &str) -> Result<SyncHistory>;

    /// Fetches the log lines of every attempt of a job
    async fn get_job_logs(&self, job_id: i64) -> Result<JobLogs>;

    /// Fetches the connection with its source catalog, without a schema refresh
    async fn get_connection_schema(&self, remote_connection_id: &str) -> Result<RemoteConnection>;
}

/// HTTP client for the connector-execution service
#[derive(Debug, Clone)]
pub struct EcsClient {
    /// Base URL of the service (e.g., "http://localhost:8000")
    base_url: String,
    client: Client,
}

impl EcsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client with a preconfigured reqwest client
    ///
    /// The per-request timeout of the service is configured here.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/api/v1/{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;

        handle_response(response).await
    }
}

#[async_trait]
impl ConnectorExecution for EcsClient {
    async fn create_connection(&self, req: &CreateRemoteConnection) -> Result<RemoteConnection> {
        self.post("web_backend/connections/create", req).await
    }

    async fn update_connection(&self, req: &UpdateRemoteConnection) -> Result<RemoteConnection> {
        self.post("web_backend/connections/update", req).await
    }

    async fn get_connection_details(&self, remote_connection_id: &str) -> Result<ConnectionMeta> {
        self.post(
            "web_backend/connections/get",
            &json!({ "connectionId": remote_connection_id }),
        )
        .await
    }

    async fn delete_connection(&self, remote_connection_id: &str) -> Result<()> {
        let url = format!("{}/api/v1/connections/delete", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "connectionId": remote_connection_id }))
            .send()
            .await?;

        handle_empty_response(response).await
    }

    async fn list_connections(
        &self,
        remote_workspace_id: &str,
    ) -> Result<Vec<RemoteConnectionSummary>> {
        let list: ConnectionList = self
            .post(
                "connections/list",
                &json!({ "workspaceId": remote_workspace_id }),
            )
            .await?;

        Ok(list.connections)
    }

    async fn trigger_sync(&self, remote_connection_id: &str) -> Result<ManualSync> {
        self.post(
            "connections/sync",
            &json!({ "connectionId": remote_connection_id }),
        )
        .await
    }

    async fn fetch_sync_history(&self, remote_connection_id: &str) -> Result<SyncHistory> {
        let query = SyncHistoryQuery {
            config_types: SYNC_HISTORY_CONFIG_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            config_id: remote_connection_id.to_string(),
        };

        self.post("jobs/list", &query).await
    }

    async fn get_job_logs(&self, job_id: i64) -> Result<JobLogs> {
        self.post("jobs/get", &json!({ "id": job_id })).await
    }

    async fn get_connection_schema(&self, remote_connection_id: &str) -> Result<RemoteConnection> {
        self.post(
            "web_backend/connections/get",
            &json!({
                "connectionId": remote_connection_id,
                "withRefreshedCatalog": false,
            }),
        )
        .await
    }
}
