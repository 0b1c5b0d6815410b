//! Pipeline Enrichment
//!
//! Decorates stored pipeline rows with live connection status from the
//! execution service and owner identity from the identity service.
//!
//! The list path fans out one task per row on a request-scoped [`JoinSet`];
//! every outbound call first takes a permit from a semaphore shared by all
//! requests. A failed, slow or cancelled lookup only blanks its own fields.
//! The detail path runs the same lookups sequentially and fails hard.
//!
//! Each call to `enrich_all` or `enrich_one` gets one deadline, `timeout`
//! from its start, shared by every lookup it makes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ferry_client::{ClientError, ConnectorExecution, IdentityLookup};
use ferry_core::domain::pipeline::{PipelineDetail, PipelineMetadata};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::warn;

use crate::service::pipeline::PipelineError;

/// Why a single lookup produced nothing
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{}", .0.upstream_message())]
    Upstream(ClientError),

    #[error("timed out fetching {0}")]
    TimedOut(&'static str),

    #[error("enrichment is shutting down")]
    Closed,
}

impl From<StepError> for PipelineError {
    fn from(err: StepError) -> Self {
        PipelineError::Upstream(err.to_string())
    }
}

/// Slack after the request deadline before unfinished rows are abandoned
const DRAIN_GRACE: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct PipelineEnricher {
    ecs: Arc<dyn ConnectorExecution>,
    identity: Arc<dyn IdentityLookup>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl PipelineEnricher {
    /// `max_concurrent` bounds outbound calls across every request served
    /// by this enricher (and its clones)
    pub fn new(
        ecs: Arc<dyn ConnectorExecution>,
        identity: Arc<dyn IdentityLookup>,
        max_concurrent: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            ecs,
            identity,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            timeout,
        }
    }

    /// Enrich every row concurrently, keeping input order
    ///
    /// Never fails: a row whose lookups fail is returned with those fields
    /// empty. Dropping the returned future aborts all in-flight lookups.
    pub async fn enrich_all(&self, mut rows: Vec<PipelineMetadata>) -> Vec<PipelineMetadata> {
        let deadline = Instant::now() + self.timeout;
        let mut units = JoinSet::new();

        for (index, row) in rows.iter().cloned().enumerate() {
            let this = self.clone();
            units.spawn(async move { (index, this.enrich_row(row, deadline).await) });
        }

        let drained = tokio::time::timeout_at(deadline + DRAIN_GRACE, async {
            while let Some(joined) = units.join_next().await {
                match joined {
                    Ok((index, enriched)) => rows[index] = enriched,
                    // The row keeps its un-enriched value
                    Err(e) => warn!("enrichment task failed: {}", e),
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("{} rows still enriching at the deadline", units.len());
            units.abort_all();
        }

        rows
    }

    async fn enrich_row(&self, mut row: PipelineMetadata, deadline: Instant) -> PipelineMetadata {
        if let Some(remote_id) = row.remote_connection_id.clone() {
            match self
                .bounded(
                    "connection details",
                    deadline,
                    self.ecs.get_connection_details(&remote_id),
                )
                .await
            {
                Ok(meta) => {
                    row.status = meta.latest_sync_job_status;
                    row.last_run = meta.latest_sync_job_created_at;
                }
                Err(e) => warn!(
                    pipeline_id = %row.pipeline_id,
                    "connection status unavailable: {}", e
                ),
            }
        }

        match self
            .bounded(
                "owner identity",
                deadline,
                self.identity.get_user_by_id(row.owner_id),
            )
            .await
        {
            Ok(owner) => row.owner = Some(owner),
            Err(e) => warn!(
                pipeline_id = %row.pipeline_id,
                owner_id = row.owner_id,
                "owner identity unavailable: {}", e
            ),
        }

        row
    }

    /// Enrich a single pipeline, failing on the first unsuccessful lookup
    pub async fn enrich_one(
        &self,
        mut detail: PipelineDetail,
    ) -> Result<PipelineDetail, PipelineError> {
        let remote_id = detail
            .remote_connection_id
            .clone()
            .ok_or(PipelineError::NotProvisioned(detail.pipeline_id))?;
        let deadline = Instant::now() + self.timeout;

        let meta = self
            .bounded(
                "connection details",
                deadline,
                self.ecs.get_connection_details(&remote_id),
            )
            .await?;
        detail.status = meta.latest_sync_job_status;
        detail.last_run = meta.latest_sync_job_created_at;

        let owner = self
            .bounded(
                "owner identity",
                deadline,
                self.identity.get_user_by_id(detail.owner_id),
            )
            .await?;
        detail.owner = Some(owner);

        Ok(detail)
    }

    /// Run one outbound call under a permit, giving up at `deadline`
    ///
    /// Waiting for the permit counts against the deadline.
    async fn bounded<T, F>(
        &self,
        what: &'static str,
        deadline: Instant,
        call: F,
    ) -> Result<T, StepError>
    where
        F: Future<Output = ferry_client::Result<T>>,
    {
        let step = async {
            let _permit = self.permits.acquire().await.map_err(|_| StepError::Closed)?;
            call.await.map_err(StepError::Upstream)
        };

        tokio::time::timeout_at(deadline, step)
            .await
            .map_err(|_| StepError::TimedOut(what))?
    }
}
