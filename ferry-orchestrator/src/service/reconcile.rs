//! Reconciliation of interrupted connection creates
//!
//! A connection row whose provisional marker outlives the grace period was
//! left behind by a create that crashed or failed to persist. The reconciler
//! either commits the remote connection it can identify or drops the marker.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use ferry_client::ConnectorExecution;
use ferry_core::domain::connection::{Connection, ConnectionResult, PendingRemote};
use tracing::{debug, info, warn};

use crate::repository::{MetadataStore, StoreResult};

/// Outcome counts of one reconciliation pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Recorded remote ids committed
    pub committed: usize,
    /// Remote connections found by source/destination and adopted
    pub adopted: usize,
    /// Markers dropped with no remote connection to keep
    pub cleared: usize,
    /// Rows left for the next pass
    pub failed: usize,
}

pub struct Reconciler {
    store: Arc<dyn MetadataStore>,
    ecs: Arc<dyn ConnectorExecution>,
    grace: Duration,
}

enum Outcome {
    Committed,
    Adopted,
    Cleared,
    Skipped,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        ecs: Arc<dyn ConnectorExecution>,
        grace: Duration,
    ) -> Self {
        Self { store, ecs, grace }
    }

    /// Reconcile every connection pending for longer than the grace period
    ///
    /// Fails only when the pending rows cannot be listed.
    pub async fn run_once(&self) -> StoreResult<ReconcileReport> {
        let cutoff = Utc::now() - TimeDelta::seconds(self.grace.as_secs() as i64);
        let pending = self.store.pending_connections(cutoff).await?;

        let mut report = ReconcileReport::default();
        for connection in pending {
            let Some(marker) = connection.pending.clone() else {
                continue;
            };

            match self.reconcile(&connection, &marker).await {
                Ok(Outcome::Committed) => report.committed += 1,
                Ok(Outcome::Adopted) => report.adopted += 1,
                Ok(Outcome::Cleared) => report.cleared += 1,
                Ok(Outcome::Skipped) => report.failed += 1,
                Err(e) => {
                    warn!(connection_id = %connection.id, "reconcile failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn reconcile(
        &self,
        connection: &Connection,
        marker: &PendingRemote,
    ) -> StoreResult<Outcome> {
        if let Some(remote_id) = &marker.remote_connection_id {
            return self
                .commit(connection, marker, remote_id, Outcome::Committed)
                .await;
        }

        let Some((remote_source, remote_destination)) =
            self.store.pending_remote_pair(connection.id).await?
        else {
            self.store.clear_connection_pending(connection.id).await?;
            return Ok(Outcome::Cleared);
        };

        let remote = match self.ecs.list_connections(&marker.remote_workspace_id).await {
            Ok(list) => list,
            Err(e) => {
                warn!(connection_id = %connection.id, "cannot list remote connections: {}", e);
                return Ok(Outcome::Skipped);
            }
        };

        match remote
            .iter()
            .find(|c| c.source_id == remote_source && c.destination_id == remote_destination)
        {
            Some(found) => {
                self.commit(connection, marker, &found.connection_id, Outcome::Adopted)
                    .await
            }
            None => {
                self.store.clear_connection_pending(connection.id).await?;
                Ok(Outcome::Cleared)
            }
        }
    }

    async fn commit(
        &self,
        connection: &Connection,
        marker: &PendingRemote,
        remote_id: &str,
        outcome: Outcome,
    ) -> StoreResult<Outcome> {
        let remote = match self.ecs.get_connection_schema(remote_id).await {
            Ok(remote) => remote,
            Err(e) if e.is_not_found() => {
                self.store.clear_connection_pending(connection.id).await?;
                return Ok(Outcome::Cleared);
            }
            Err(e) => {
                warn!(connection_id = %connection.id, "cannot fetch remote connection {}: {}", remote_id, e);
                return Ok(Outcome::Skipped);
            }
        };

        let result = ConnectionResult {
            connection_id: connection.id,
            destination_id: marker.destination_id,
            remote_connection_id: remote.connection_id,
            remote_status: remote.status,
            schedule: remote.schedule,
            owner: connection.owner,
            workspace_id: connection.workspace_id,
        };

        if !self.store.commit_connection_result(&result).await? {
            return Ok(Outcome::Skipped);
        }

        info!(
            "Reconciled connection {} -> remote {}",
            connection.id, result.remote_connection_id
        );
        Ok(outcome)
    }

    /// Run a pass every `interval` until the task is dropped
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            match self.run_once().await {
                Ok(report) if report == ReconcileReport::default() => {
                    debug!("Reconcile pass: nothing pending");
                }
                Ok(report) => info!(?report, "Reconcile pass complete"),
                Err(e) => warn!("Reconcile pass failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::connection::ConnectionOrchestrator;
    use crate::testing::{InMemoryStore, StubEcs, actor, create_request};
    use ferry_client::types::RemoteConnectionSummary;

    fn reconciler(store: &Arc<InMemoryStore>, ecs: &Arc<StubEcs>) -> Reconciler {
        Reconciler::new(store.clone(), ecs.clone(), Duration::from_secs(60))
    }

    fn backdate(store: &InMemoryStore, connection_id: uuid::Uuid) {
        store.age_pending(connection_id, Utc::now() - TimeDelta::minutes(10));
    }

    #[tokio::test]
    async fn test_repairs_recorded_but_unpersisted_remote() {
        let store = Arc::new(InMemoryStore::new());
        let ecs = Arc::new(StubEcs::new().with_connection_id("conn-99"));
        let seeded = store.seed("orders", "S1", "D1");

        store.fail_on("commit_connection_result");
        let orchestrator = ConnectionOrchestrator::new(store.clone(), ecs.clone());
        let _ = orchestrator
            .create_connection(&actor(), create_request(seeded.source_id, seeded.destination_id))
            .await
            .unwrap_err();

        // Fresh markers are left alone
        let report = reconciler(&store, &ecs).run_once().await.unwrap();
        assert_eq!(report, ReconcileReport::default());

        backdate(&store, seeded.connection_id);
        store.recover("commit_connection_result");

        let report = reconciler(&store, &ecs).run_once().await.unwrap();
        assert_eq!(report.committed, 1);

        let conn = store.connection(seeded.connection_id).unwrap();
        assert_eq!(conn.remote_connection_id.as_deref(), Some("conn-99"));
        assert!(conn.pending.is_none());
        // No second remote create
        assert_eq!(ecs.call_count("create_connection"), 1);
    }

    #[tokio::test]
    async fn test_commits_recorded_remote_id() {
        let store = Arc::new(InMemoryStore::new());
        let ecs = Arc::new(StubEcs::new());
        let seeded = store.seed("orders", "S1", "D1");

        store
            .mark_connection_pending(seeded.connection_id, seeded.destination_id, "ws-remote")
            .await
            .unwrap();
        store
            .record_unrecorded_remote(seeded.connection_id, "conn-99")
            .await
            .unwrap();
        backdate(&store, seeded.connection_id);

        let report = reconciler(&store, &ecs).run_once().await.unwrap();

        assert_eq!(report.committed, 1);
        let conn = store.connection(seeded.connection_id).unwrap();
        assert_eq!(conn.remote_connection_id.as_deref(), Some("conn-99"));
        assert!(conn.pending.is_none());
        assert!(store.is_linked(seeded.connection_id, seeded.destination_id));
    }

    #[tokio::test]
    async fn test_adopts_remote_matched_by_source_and_destination() {
        let store = Arc::new(InMemoryStore::new());
        let ecs = Arc::new(StubEcs::new());
        let seeded = store.seed("orders", "S1", "D1");
        ecs.add_remote(RemoteConnectionSummary {
            connection_id: "conn-other".to_string(),
            source_id: "S1".to_string(),
            destination_id: "D9".to_string(),
            name: String::new(),
            status: "active".to_string(),
        });
        ecs.add_remote(RemoteConnectionSummary {
            connection_id: "conn-lost".to_string(),
            source_id: "S1".to_string(),
            destination_id: "D1".to_string(),
            name: String::new(),
            status: "active".to_string(),
        });

        store
            .mark_connection_pending(seeded.connection_id, seeded.destination_id, "ws-remote")
            .await
            .unwrap();
        backdate(&store, seeded.connection_id);

        let report = reconciler(&store, &ecs).run_once().await.unwrap();

        assert_eq!(report.adopted, 1);
        let conn = store.connection(seeded.connection_id).unwrap();
        assert_eq!(conn.remote_connection_id.as_deref(), Some("conn-lost"));
    }

    #[tokio::test]
    async fn test_clears_marker_without_remote_match() {
        let store = Arc::new(InMemoryStore::new());
        let ecs = Arc::new(StubEcs::new());
        let seeded = store.seed("orders", "S1", "D1");

        store
            .mark_connection_pending(seeded.connection_id, seeded.destination_id, "ws-remote")
            .await
            .unwrap();
        backdate(&store, seeded.connection_id);

        let report = reconciler(&store, &ecs).run_once().await.unwrap();

        assert_eq!(report.cleared, 1);
        let conn = store.connection(seeded.connection_id).unwrap();
        assert!(conn.pending.is_none());
        assert_eq!(conn.remote_connection_id, None);
    }

    #[tokio::test]
    async fn test_remote_listing_failure_keeps_marker() {
        let store = Arc::new(InMemoryStore::new());
        let ecs = Arc::new(StubEcs::new());
        let seeded = store.seed("orders", "S1", "D1");
        ecs.fail("list_connections");

        store
            .mark_connection_pending(seeded.connection_id, seeded.destination_id, "ws-remote")
            .await
            .unwrap();
        backdate(&store, seeded.connection_id);

        let report = reconciler(&store, &ecs).run_once().await.unwrap();

        assert_eq!(report.failed, 1);
        assert!(store.connection(seeded.connection_id).unwrap().pending.is_some());
    }
}
