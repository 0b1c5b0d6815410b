//! In-memory doubles for the store and the two remote services

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferry_client::types::{
    ConnectionMeta, CreateRemoteConnection, JobLogs, ManualSync, RemoteConnection,
    RemoteConnectionSummary, SyncHistory, SyncJob, UpdateRemoteConnection,
};
use ferry_client::{ClientError, ConnectorExecution, IdentityLookup};
use ferry_core::domain::connection::{
    Connection, ConnectionRefs, ConnectionResult, PendingRemote, Schedule,
};
use ferry_core::domain::identity::{Actor, IdentitySummary};
use ferry_core::domain::pipeline::{Pipeline, PipelineDetail, PipelineMetadata, PipelineStatus};
use ferry_core::dto::connection::{
    CatalogEntry, CreateConnectionRequest, Stream, StreamConfig, SyncCatalog,
    UpdateConnectionRequest,
};
use ferry_core::dto::pipeline::{CreatePipeline, UpdatePipeline};
use uuid::Uuid;

use crate::repository::{MetadataStore, StoreResult};

// =============================================================================
// Fixtures
// =============================================================================

pub fn actor() -> Actor {
    Actor {
        user_id: 7,
        workspace_id: 3,
        remote_workspace_id: Some("ws-remote".to_string()),
    }
}

pub fn catalog() -> SyncCatalog {
    SyncCatalog {
        streams: vec![CatalogEntry {
            stream: Stream {
                name: "orders".to_string(),
                ..Default::default()
            },
            config: StreamConfig {
                sync_mode: "full_refresh".to_string(),
                destination_sync_mode: "overwrite".to_string(),
                selected: true,
                ..Default::default()
            },
        }],
    }
}

pub fn create_request(source_id: Uuid, destination_id: Uuid) -> CreateConnectionRequest {
    CreateConnectionRequest {
        source_id,
        destination_id,
        schedule: Some(Schedule {
            units: 1,
            time_unit: "hours".to_string(),
        }),
        sync_catalog: catalog(),
        prefix: "raw_".to_string(),
        operations: vec![],
    }
}

pub fn update_request(schedule: Option<Schedule>) -> UpdateConnectionRequest {
    UpdateConnectionRequest {
        prefix: "raw_".to_string(),
        sync_catalog: catalog(),
        schedule,
        status: "active".to_string(),
        operations: vec![],
    }
}

fn injected() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

// =============================================================================
// Metadata store
// =============================================================================

#[derive(Debug, Clone)]
struct SourceRecord {
    connection_id: Uuid,
    name: String,
    remote_id: String,
}

#[derive(Debug, Clone)]
struct DestinationRecord {
    name: String,
    remote_id: String,
    workspace_id: i64,
}

#[derive(Debug, Default)]
struct State {
    pipelines: HashMap<Uuid, Pipeline>,
    connections: HashMap<Uuid, Connection>,
    sources: HashMap<Uuid, SourceRecord>,
    destinations: HashMap<Uuid, DestinationRecord>,
    links: HashSet<(Uuid, Uuid)>,
}

/// Store double with per-operation failure injection
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    failing: Mutex<HashSet<&'static str>>,
    writes: AtomicUsize,
}

/// A pipeline seeded with a source and a destination, ready for a create
#[derive(Debug, Clone, Copy)]
pub struct Seeded {
    pub pipeline_id: Uuid,
    pub connection_id: Uuid,
    pub source_id: Uuid,
    pub destination_id: Uuid,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named trait method return an error from now on
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// Undo a previous `fail_on`
    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    /// Number of successful write calls
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &'static str) -> StoreResult<()> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(injected());
        }
        Ok(())
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Seed a pipeline whose source and destination exist on the remote side
    pub fn seed(&self, name: &str, remote_source: &str, remote_destination: &str) -> Seeded {
        let mut state = self.state.lock().unwrap();
        let actor = actor();
        let pipeline_id = Uuid::new_v4();
        let connection_id = Uuid::new_v4();
        let source_id = Uuid::new_v4();
        let destination_id = Uuid::new_v4();

        state.pipelines.insert(
            pipeline_id,
            Pipeline {
                id: pipeline_id,
                name: name.to_string(),
                governance: vec![],
                status: PipelineStatus::Active,
                owner: actor.user_id,
                workspace_id: actor.workspace_id,
                created_at: Utc::now(),
            },
        );
        state.connections.insert(
            connection_id,
            Connection {
                id: connection_id,
                pipeline_id,
                remote_connection_id: None,
                remote_status: None,
                schedule_units: None,
                schedule_time_unit: None,
                is_first_run: true,
                owner: actor.user_id,
                workspace_id: actor.workspace_id,
                created_at: Utc::now(),
                pending: None,
            },
        );
        state.sources.insert(
            source_id,
            SourceRecord {
                connection_id,
                name: format!("{} source", name),
                remote_id: remote_source.to_string(),
            },
        );
        state.destinations.insert(
            destination_id,
            DestinationRecord {
                name: format!("{} destination", name),
                remote_id: remote_destination.to_string(),
                workspace_id: actor.workspace_id,
            },
        );

        Seeded {
            pipeline_id,
            connection_id,
            source_id,
            destination_id,
        }
    }

    /// Mark a seeded connection as already provisioned remotely
    pub fn provision(&self, connection_id: Uuid, destination_id: Uuid, remote_id: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(conn) = state.connections.get_mut(&connection_id) {
            conn.remote_connection_id = Some(remote_id.to_string());
            conn.remote_status = Some("active".to_string());
        }
        state.links.insert((connection_id, destination_id));
    }

    /// Backdate a connection's provisional marker
    pub fn age_pending(&self, connection_id: Uuid, since: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(pending) = state
            .connections
            .get_mut(&connection_id)
            .and_then(|c| c.pending.as_mut())
        {
            pending.since = since;
        }
    }

    pub fn connection(&self, connection_id: Uuid) -> Option<Connection> {
        self.state
            .lock()
            .unwrap()
            .connections
            .get(&connection_id)
            .cloned()
    }

    pub fn pipeline(&self, pipeline_id: Uuid) -> Option<Pipeline> {
        self.state
            .lock()
            .unwrap()
            .pipelines
            .get(&pipeline_id)
            .cloned()
    }

    pub fn is_linked(&self, connection_id: Uuid, destination_id: Uuid) -> bool {
        self.state
            .lock()
            .unwrap()
            .links
            .contains(&(connection_id, destination_id))
    }

    fn projection(state: &State, pipeline: &Pipeline) -> PipelineMetadata {
        let connection = state
            .connections
            .values()
            .find(|c| c.pipeline_id == pipeline.id);
        let source = connection.and_then(|c| {
            state
                .sources
                .iter()
                .find(|(_, s)| s.connection_id == c.id)
        });
        let destination = connection.and_then(|c| {
            state
                .links
                .iter()
                .find(|(conn, _)| *conn == c.id)
                .and_then(|(_, d)| state.destinations.get_key_value(d))
        });

        PipelineMetadata {
            pipeline_id: pipeline.id,
            pipeline_name: pipeline.name.clone(),
            pipeline_governance: pipeline.governance.clone(),
            pipeline_status: pipeline.status.as_str().to_string(),
            source_id: source.map(|(id, _)| *id),
            source_name: source.map(|(_, s)| s.name.clone()),
            destination_id: destination.map(|(id, _)| *id),
            destination_name: destination.map(|(_, d)| d.name.clone()),
            connection_id: connection.map(|c| c.id),
            remote_connection_id: connection.and_then(|c| c.remote_connection_id.clone()),
            owner_id: pipeline.owner,
            ..Default::default()
        }
    }
}

#[async_trait]
impl MetadataStore for InMemoryStore {
    async fn resolve_connection_refs(
        &self,
        source_id: Uuid,
        destination_id: Uuid,
        workspace_id: i64,
    ) -> StoreResult<Option<ConnectionRefs>> {
        self.check("resolve_connection_refs")?;
        let state = self.state.lock().unwrap();

        let (Some(source), Some(destination)) = (
            state.sources.get(&source_id),
            state
                .destinations
                .get(&destination_id)
                .filter(|d| d.workspace_id == workspace_id),
        ) else {
            return Ok(None);
        };
        let Some(connection) = state.connections.get(&source.connection_id) else {
            return Ok(None);
        };
        let Some(pipeline) = state
            .pipelines
            .get(&connection.pipeline_id)
            .filter(|p| p.workspace_id == workspace_id)
        else {
            return Ok(None);
        };

        Ok(Some(ConnectionRefs {
            connection_id: connection.id,
            pipeline_id: pipeline.id,
            pipeline_name: pipeline.name.clone(),
            source_id,
            remote_source_id: source.remote_id.clone(),
            destination_id,
            remote_destination_id: destination.remote_id.clone(),
        }))
    }

    async fn mark_connection_pending(
        &self,
        connection_id: Uuid,
        destination_id: Uuid,
        remote_workspace_id: &str,
    ) -> StoreResult<bool> {
        self.check("mark_connection_pending")?;
        let mut state = self.state.lock().unwrap();
        let Some(conn) = state
            .connections
            .get_mut(&connection_id)
            .filter(|c| c.remote_connection_id.is_none() && c.pending.is_none())
        else {
            return Ok(false);
        };
        conn.pending = Some(PendingRemote {
            since: Utc::now(),
            destination_id,
            remote_workspace_id: remote_workspace_id.to_string(),
            remote_connection_id: None,
        });
        self.wrote();
        Ok(true)
    }

    async fn commit_connection_result(&self, result: &ConnectionResult) -> StoreResult<bool> {
        self.check("commit_connection_result")?;
        let mut state = self.state.lock().unwrap();
        let Some(conn) = state.connections.get_mut(&result.connection_id) else {
            return Ok(false);
        };
        conn.remote_connection_id = Some(result.remote_connection_id.clone());
        conn.remote_status = Some(result.remote_status.clone());
        conn.schedule_units = result.schedule.as_ref().map(|s| s.units);
        conn.schedule_time_unit = Some(
            result
                .schedule
                .as_ref()
                .map(|s| s.time_unit.clone())
                .unwrap_or_else(|| "minutes".to_string()),
        );
        conn.owner = result.owner;
        conn.workspace_id = result.workspace_id;
        conn.pending = None;
        state
            .links
            .insert((result.connection_id, result.destination_id));
        self.wrote();
        Ok(true)
    }

    async fn record_unrecorded_remote(
        &self,
        connection_id: Uuid,
        remote_connection_id: &str,
    ) -> StoreResult<bool> {
        self.check("record_unrecorded_remote")?;
        let mut state = self.state.lock().unwrap();
        let Some(pending) = state
            .connections
            .get_mut(&connection_id)
            .and_then(|c| c.pending.as_mut())
        else {
            return Ok(false);
        };
        pending.remote_connection_id = Some(remote_connection_id.to_string());
        self.wrote();
        Ok(true)
    }

    async fn clear_connection_pending(&self, connection_id: Uuid) -> StoreResult<bool> {
        self.check("clear_connection_pending")?;
        let mut state = self.state.lock().unwrap();
        let Some(conn) = state.connections.get_mut(&connection_id) else {
            return Ok(false);
        };
        conn.pending = None;
        self.wrote();
        Ok(true)
    }

    async fn pending_connections(
        &self,
        older_than: DateTime<Utc>,
    ) -> StoreResult<Vec<Connection>> {
        self.check("pending_connections")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .connections
            .values()
            .filter(|c| c.pending.as_ref().is_some_and(|p| p.since < older_than))
            .cloned()
            .collect())
    }

    async fn pending_remote_pair(
        &self,
        connection_id: Uuid,
    ) -> StoreResult<Option<(String, String)>> {
        self.check("pending_remote_pair")?;
        let state = self.state.lock().unwrap();
        let Some(pending) = state
            .connections
            .get(&connection_id)
            .and_then(|c| c.pending.as_ref())
        else {
            return Ok(None);
        };
        let source = state
            .sources
            .values()
            .find(|s| s.connection_id == connection_id);
        let destination = state.destinations.get(&pending.destination_id);

        Ok(source
            .zip(destination)
            .map(|(s, d)| (s.remote_id.clone(), d.remote_id.clone())))
    }

    async fn get_connection(&self, connection_id: Uuid) -> StoreResult<Option<Connection>> {
        self.check("get_connection")?;
        Ok(self.connection(connection_id))
    }

    async fn get_pipeline_connection(
        &self,
        pipeline_id: Uuid,
    ) -> StoreResult<Option<Connection>> {
        self.check("get_pipeline_connection")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .connections
            .values()
            .find(|c| c.pipeline_id == pipeline_id)
            .cloned())
    }

    async fn list_connections(&self) -> StoreResult<Vec<Connection>> {
        self.check("list_connections")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .connections
            .values()
            .cloned()
            .collect())
    }

    async fn update_connection_schedule(
        &self,
        connection_id: Uuid,
        schedule: Option<&Schedule>,
        remote_status: &str,
    ) -> StoreResult<bool> {
        self.check("update_connection_schedule")?;
        let mut state = self.state.lock().unwrap();
        let Some(conn) = state.connections.get_mut(&connection_id) else {
            return Ok(false);
        };
        conn.schedule_units = schedule.map(|s| s.units);
        conn.schedule_time_unit = Some(
            schedule
                .map(|s| s.time_unit.clone())
                .unwrap_or_else(|| "minutes".to_string()),
        );
        conn.remote_status = Some(remote_status.to_string());
        conn.is_first_run = false;
        self.wrote();
        Ok(true)
    }

    async fn create_pipeline(&self, actor: &Actor, req: CreatePipeline) -> StoreResult<Pipeline> {
        self.check("create_pipeline")?;
        let pipeline = Pipeline {
            id: Uuid::new_v4(),
            name: req.name,
            governance: req.governance,
            status: PipelineStatus::Active,
            owner: actor.user_id,
            workspace_id: actor.workspace_id,
            created_at: Utc::now(),
        };
        let connection = Connection {
            id: Uuid::new_v4(),
            pipeline_id: pipeline.id,
            remote_connection_id: None,
            remote_status: None,
            schedule_units: None,
            schedule_time_unit: None,
            is_first_run: true,
            owner: actor.user_id,
            workspace_id: actor.workspace_id,
            created_at: pipeline.created_at,
            pending: None,
        };
        let mut state = self.state.lock().unwrap();
        state.pipelines.insert(pipeline.id, pipeline.clone());
        state.connections.insert(connection.id, connection);
        self.wrote();
        Ok(pipeline)
    }

    async fn update_pipeline(&self, pipeline_id: Uuid, req: &UpdatePipeline) -> StoreResult<bool> {
        self.check("update_pipeline")?;
        let mut state = self.state.lock().unwrap();
        let Some(pipeline) = state.pipelines.get_mut(&pipeline_id) else {
            return Ok(false);
        };
        pipeline.name = req.name.clone();
        pipeline.governance = req.governance.clone();
        self.wrote();
        Ok(true)
    }

    async fn get_pipeline(&self, pipeline_id: Uuid) -> StoreResult<Option<Pipeline>> {
        self.check("get_pipeline")?;
        Ok(self.pipeline(pipeline_id))
    }

    async fn list_pipeline_rows(&self, workspace_id: i64) -> StoreResult<Vec<PipelineMetadata>> {
        self.check("list_pipeline_rows")?;
        let state = self.state.lock().unwrap();
        let mut pipelines: Vec<&Pipeline> = state
            .pipelines
            .values()
            .filter(|p| p.workspace_id == workspace_id && p.status != PipelineStatus::Deleted)
            .collect();
        pipelines.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(pipelines
            .into_iter()
            .map(|p| Self::projection(&state, p))
            .collect())
    }

    async fn get_pipeline_detail(
        &self,
        pipeline_id: Uuid,
        workspace_id: i64,
    ) -> StoreResult<Option<PipelineDetail>> {
        self.check("get_pipeline_detail")?;
        let state = self.state.lock().unwrap();
        let Some(pipeline) = state
            .pipelines
            .get(&pipeline_id)
            .filter(|p| p.workspace_id == workspace_id)
        else {
            return Ok(None);
        };
        let row = Self::projection(&state, pipeline);

        Ok(Some(PipelineDetail {
            pipeline_id: row.pipeline_id,
            name: row.pipeline_name,
            governance: row.pipeline_governance,
            created_at: pipeline.created_at,
            pipeline_status: row.pipeline_status,
            source_id: row.source_id,
            source_name: row.source_name,
            destination_id: row.destination_id,
            destination_name: row.destination_name,
            connection_id: row.connection_id,
            remote_connection_id: row.remote_connection_id,
            owner_id: row.owner_id,
            status: None,
            last_run: None,
            owner: None,
        }))
    }

    async fn update_pipeline_status(
        &self,
        pipeline_id: Uuid,
        status: PipelineStatus,
    ) -> StoreResult<bool> {
        self.check("update_pipeline_status")?;
        let mut state = self.state.lock().unwrap();
        let Some(pipeline) = state.pipelines.get_mut(&pipeline_id) else {
            return Ok(false);
        };
        pipeline.status = status;
        self.wrote();
        Ok(true)
    }

    async fn delete_pipeline(&self, pipeline_id: Uuid) -> StoreResult<bool> {
        self.check("delete_pipeline")?;
        let mut state = self.state.lock().unwrap();
        if state.pipelines.remove(&pipeline_id).is_none() {
            return Ok(false);
        }
        let removed: Vec<Uuid> = state
            .connections
            .values()
            .filter(|c| c.pipeline_id == pipeline_id)
            .map(|c| c.id)
            .collect();
        for id in removed {
            state.connections.remove(&id);
            state.sources.retain(|_, s| s.connection_id != id);
            state.links.retain(|(conn, _)| *conn != id);
        }
        self.wrote();
        Ok(true)
    }
}

// =============================================================================
// Connector execution
// =============================================================================

/// Execution-service double
///
/// Details of remote id `X` report status `status-X` so callers can check
/// that each row received its own answer.
#[derive(Debug, Default)]
pub struct StubEcs {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    latency: Mutex<HashMap<String, Duration>>,
    next_connection_id: Mutex<Option<String>>,
    assigned_schedule: Mutex<Option<Schedule>>,
    remote: Mutex<Vec<RemoteConnectionSummary>>,
    created: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubEcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id handed out by the next create
    pub fn with_connection_id(self, id: &str) -> Self {
        *self.next_connection_id.lock().unwrap() = Some(id.to_string());
        self
    }

    /// Answer creates and updates with this schedule instead of echoing the request
    pub fn with_schedule(self, schedule: Schedule) -> Self {
        *self.assigned_schedule.lock().unwrap() = Some(schedule);
        self
    }

    /// Fail an operation by name, or the details fetch of one remote id
    pub fn fail(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    /// Delay every call addressing one remote id
    pub fn delay(&self, remote_id: &str, latency: Duration) {
        self.latency
            .lock()
            .unwrap()
            .insert(remote_id.to_string(), latency);
    }

    /// Make a connection visible to `list_connections`
    pub fn add_remote(&self, summary: RemoteConnectionSummary) {
        self.remote.lock().unwrap().push(summary);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, operation: &str, key: Option<&str>) -> ferry_client::Result<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        let failing = self.failing.lock().unwrap();
        if failing.contains(operation) || key.is_some_and(|k| failing.contains(k)) {
            return Err(ClientError::api_error(
                500,
                format!("{} rejected by execution service", operation),
            ));
        }
        Ok(())
    }

    async fn pause(&self, remote_id: &str) {
        let latency = self.latency.lock().unwrap().get(remote_id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn answered_schedule(&self, requested: Option<&Schedule>) -> Option<Schedule> {
        self.assigned_schedule
            .lock()
            .unwrap()
            .clone()
            .or_else(|| requested.cloned())
    }

    fn remote_connection(id: &str, status: &str, schedule: Option<Schedule>) -> RemoteConnection {
        RemoteConnection {
            connection_id: id.to_string(),
            name: String::new(),
            namespace_definition: "customformat".to_string(),
            namespace_format: String::new(),
            prefix: String::new(),
            source_id: String::new(),
            destination_id: String::new(),
            sync_catalog: SyncCatalog::default(),
            schedule,
            status: status.to_string(),
            operation_ids: vec![],
            source: None,
            destination: None,
        }
    }
}

#[async_trait]
impl ConnectorExecution for StubEcs {
    async fn create_connection(
        &self,
        req: &CreateRemoteConnection,
    ) -> ferry_client::Result<RemoteConnection> {
        self.record("create_connection", None)?;
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let id = self
            .next_connection_id
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| format!("conn-{}", n));
        let schedule = self.answered_schedule(req.schedule());
        Ok(Self::remote_connection(&id, "active", schedule))
    }

    async fn update_connection(
        &self,
        req: &UpdateRemoteConnection,
    ) -> ferry_client::Result<RemoteConnection> {
        self.pause(req.connection_id()).await;
        self.record("update_connection", Some(req.connection_id()))?;
        let schedule = self.answered_schedule(req.schedule());
        Ok(Self::remote_connection(req.connection_id(), "active", schedule))
    }

    async fn get_connection_details(
        &self,
        remote_connection_id: &str,
    ) -> ferry_client::Result<ConnectionMeta> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.pause(remote_connection_id).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.record("get_connection_details", Some(remote_connection_id))?;
        Ok(ConnectionMeta {
            latest_sync_job_created_at: Some(1_700_000_000),
            latest_sync_job_status: Some(format!("status-{}", remote_connection_id)),
        })
    }

    async fn delete_connection(&self, remote_connection_id: &str) -> ferry_client::Result<()> {
        self.pause(remote_connection_id).await;
        self.record("delete_connection", Some(remote_connection_id))
    }

    async fn list_connections(
        &self,
        _remote_workspace_id: &str,
    ) -> ferry_client::Result<Vec<RemoteConnectionSummary>> {
        self.record("list_connections", None)?;
        Ok(self.remote.lock().unwrap().clone())
    }

    async fn trigger_sync(&self, remote_connection_id: &str) -> ferry_client::Result<ManualSync> {
        self.record("trigger_sync", Some(remote_connection_id))?;
        Ok(ManualSync {
            job: SyncJob {
                id: 1,
                config_type: "sync".to_string(),
                config_id: remote_connection_id.to_string(),
                created_at: 0,
                updated_at: 0,
                status: "running".to_string(),
            },
            attempts: vec![],
        })
    }

    async fn fetch_sync_history(
        &self,
        remote_connection_id: &str,
    ) -> ferry_client::Result<SyncHistory> {
        self.record("fetch_sync_history", Some(remote_connection_id))?;
        Ok(SyncHistory::default())
    }

    async fn get_job_logs(&self, _job_id: i64) -> ferry_client::Result<JobLogs> {
        self.record("get_job_logs", None)?;
        Ok(JobLogs::default())
    }

    async fn get_connection_schema(
        &self,
        remote_connection_id: &str,
    ) -> ferry_client::Result<RemoteConnection> {
        self.record("get_connection_schema", Some(remote_connection_id))?;
        Ok(Self::remote_connection(
            remote_connection_id,
            "active",
            Some(Schedule {
                units: 1,
                time_unit: "hours".to_string(),
            }),
        ))
    }
}

// =============================================================================
// Identity
// =============================================================================

#[derive(Debug, Default)]
pub struct StubIdentity {
    failing: Mutex<HashSet<i64>>,
    latency: Mutex<HashMap<i64, Duration>>,
    calls: AtomicUsize,
}

impl StubIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, user_id: i64) {
        self.failing.lock().unwrap().insert(user_id);
    }

    pub fn delay(&self, user_id: i64, latency: Duration) {
        self.latency.lock().unwrap().insert(user_id, latency);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityLookup for StubIdentity {
    async fn get_user_by_id(&self, user_id: i64) -> ferry_client::Result<IdentitySummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency.lock().unwrap().get(&user_id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.lock().unwrap().contains(&user_id) {
            return Err(ClientError::NotFound(format!("user {}", user_id)));
        }

        Ok(IdentitySummary {
            id: user_id,
            email: format!("user{}@example.com", user_id),
            first_name: "User".to_string(),
            last_name: user_id.to_string(),
            workspace_id: None,
        })
    }
}
