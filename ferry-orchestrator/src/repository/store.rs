//! Metadata store seam
//!
//! Services depend on [`MetadataStore`] rather than on a pool so they can run
//! against an in-memory store in tests. [`PgStore`] forwards every call to the
//! repository functions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferry_core::domain::connection::{Connection, ConnectionRefs, ConnectionResult, Schedule};
use ferry_core::domain::identity::Actor;
use ferry_core::domain::pipeline::{Pipeline, PipelineDetail, PipelineMetadata, PipelineStatus};
use ferry_core::dto::pipeline::{CreatePipeline, UpdatePipeline};
use sqlx::PgPool;
use uuid::Uuid;

use super::{connection_repository, pipeline_repository};

pub type StoreResult<T> = Result<T, sqlx::Error>;

/// Persistent pipeline and connection metadata
///
/// Absence is `Ok(None)` (or `Ok(false)` for writes), never an error.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Both sides must belong to `workspace_id`
    async fn resolve_connection_refs(
        &self,
        source_id: Uuid,
        destination_id: Uuid,
        workspace_id: i64,
    ) -> StoreResult<Option<ConnectionRefs>>;

    /// Set the provisional marker; `false` unless the connection exists, has
    /// no remote connection and no marker
    async fn mark_connection_pending(
        &self,
        connection_id: Uuid,
        destination_id: Uuid,
        remote_workspace_id: &str,
    ) -> StoreResult<bool>;

    /// Persist remote id, status and schedule and link the destination in
    /// one transaction
    async fn commit_connection_result(&self, result: &ConnectionResult) -> StoreResult<bool>;

    async fn record_unrecorded_remote(
        &self,
        connection_id: Uuid,
        remote_connection_id: &str,
    ) -> StoreResult<bool>;

    async fn clear_connection_pending(&self, connection_id: Uuid) -> StoreResult<bool>;

    async fn pending_connections(&self, older_than: DateTime<Utc>)
    -> StoreResult<Vec<Connection>>;

    async fn pending_remote_pair(&self, connection_id: Uuid)
    -> StoreResult<Option<(String, String)>>;

    async fn get_connection(&self, connection_id: Uuid) -> StoreResult<Option<Connection>>;

    async fn get_pipeline_connection(&self, pipeline_id: Uuid)
    -> StoreResult<Option<Connection>>;

    async fn list_connections(&self) -> StoreResult<Vec<Connection>>;

    async fn update_connection_schedule(
        &self,
        connection_id: Uuid,
        schedule: Option<&Schedule>,
        remote_status: &str,
    ) -> StoreResult<bool>;

    async fn create_pipeline(&self, actor: &Actor, req: CreatePipeline) -> StoreResult<Pipeline>;

    async fn update_pipeline(&self, pipeline_id: Uuid, req: &UpdatePipeline) -> StoreResult<bool>;

    async fn get_pipeline(&self, pipeline_id: Uuid) -> StoreResult<Option<Pipeline>>;

    async fn list_pipeline_rows(&self, workspace_id: i64) -> StoreResult<Vec<PipelineMetadata>>;

    async fn get_pipeline_detail(
        &self,
        pipeline_id: Uuid,
        workspace_id: i64,
    ) -> StoreResult<Option<PipelineDetail>>;

    async fn update_pipeline_status(
        &self,
        pipeline_id: Uuid,
        status: PipelineStatus,
    ) -> StoreResult<bool>;

    async fn delete_pipeline(&self, pipeline_id: Uuid) -> StoreResult<bool>;
}

/// PostgreSQL-backed metadata store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for PgStore {
    async fn resolve_connection_refs(
        &self,
        source_id: Uuid,
        destination_id: Uuid,
        workspace_id: i64,
    ) -> StoreResult<Option<ConnectionRefs>> {
        connection_repository::resolve_refs(&self.pool, source_id, destination_id, workspace_id)
            .await
    }

    async fn mark_connection_pending(
        &self,
        connection_id: Uuid,
        destination_id: Uuid,
        remote_workspace_id: &str,
    ) -> StoreResult<bool> {
        connection_repository::mark_pending(
            &self.pool,
            connection_id,
            destination_id,
            remote_workspace_id,
        )
        .await
    }

    async fn commit_connection_result(&self, result: &ConnectionResult) -> StoreResult<bool> {
        connection_repository::commit_result(&self.pool, result).await
    }

    async fn record_unrecorded_remote(
        &self,
        connection_id: Uuid,
        remote_connection_id: &str,
    ) -> StoreResult<bool> {
        connection_repository::record_unrecorded_remote(
            &self.pool,
            connection_id,
            remote_connection_id,
        )
        .await
    }

    async fn clear_connection_pending(&self, connection_id: Uuid) -> StoreResult<bool> {
        connection_repository::clear_pending(&self.pool, connection_id).await
    }

    async fn pending_connections(
        &self,
        older_than: DateTime<Utc>,
    ) -> StoreResult<Vec<Connection>> {
        connection_repository::find_pending(&self.pool, older_than).await
    }

    async fn pending_remote_pair(
        &self,
        connection_id: Uuid,
    ) -> StoreResult<Option<(String, String)>> {
        connection_repository::find_pending_remote_pair(&self.pool, connection_id).await
    }

    async fn get_connection(&self, connection_id: Uuid) -> StoreResult<Option<Connection>> {
        connection_repository::find_by_id(&self.pool, connection_id).await
    }

    async fn get_pipeline_connection(
        &self,
        pipeline_id: Uuid,
    ) -> StoreResult<Option<Connection>> {
        connection_repository::find_by_pipeline(&self.pool, pipeline_id).await
    }

    async fn list_connections(&self) -> StoreResult<Vec<Connection>> {
        connection_repository::list_all(&self.pool).await
    }

    async fn update_connection_schedule(
        &self,
        connection_id: Uuid,
        schedule: Option<&Schedule>,
        remote_status: &str,
    ) -> StoreResult<bool> {
        connection_repository::update_schedule(&self.pool, connection_id, schedule, remote_status)
            .await
    }

    async fn create_pipeline(&self, actor: &Actor, req: CreatePipeline) -> StoreResult<Pipeline> {
        pipeline_repository::create(&self.pool, actor, req).await
    }

    async fn update_pipeline(&self, pipeline_id: Uuid, req: &UpdatePipeline) -> StoreResult<bool> {
        pipeline_repository::update(&self.pool, pipeline_id, req).await
    }

    async fn get_pipeline(&self, pipeline_id: Uuid) -> StoreResult<Option<Pipeline>> {
        pipeline_repository::find_by_id(&self.pool, pipeline_id).await
    }

    async fn list_pipeline_rows(&self, workspace_id: i64) -> StoreResult<Vec<PipelineMetadata>> {
        pipeline_repository::list_metadata(&self.pool, workspace_id).await
    }

    async fn get_pipeline_detail(
        &self,
        pipeline_id: Uuid,
        workspace_id: i64,
    ) -> StoreResult<Option<PipelineDetail>> {
        pipeline_repository::find_detail(&self.pool, pipeline_id, workspace_id).await
    }

    async fn update_pipeline_status(
        &self,
        pipeline_id: Uuid,
        status: PipelineStatus,
    ) -> StoreResult<bool> {
        pipeline_repository::update_status(&self.pool, pipeline_id, status).await
    }

    async fn delete_pipeline(&self, pipeline_id: Uuid) -> StoreResult<bool> {
        pipeline_repository::delete(&self.pool, pipeline_id).await
    }
}
