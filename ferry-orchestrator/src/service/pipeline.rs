//! Pipeline Service
//!
//! Business logic for pipeline management and the enriched list/detail views.

use std::sync::Arc;

use ferry_core::domain::identity::Actor;
use ferry_core::domain::pipeline::{Pipeline, PipelineDetail, PipelineMetadata, PipelineStatus};
use ferry_core::dto::pipeline::{CreatePipeline, UpdatePipeline};
use thiserror::Error;
use uuid::Uuid;

use crate::repository::MetadataStore;
use crate::service::enrichment::PipelineEnricher;

/// Service error type
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    ValidationError(String),

    #[error("Pipeline {0} has no connection on the execution service")]
    NotProvisioned(Uuid),

    /// Remote lookup failed; the message is the remote text unchanged
    #[error("{0}")]
    Upstream(String),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

pub struct PipelineService {
    store: Arc<dyn MetadataStore>,
    enricher: PipelineEnricher,
}

impl PipelineService {
    pub fn new(store: Arc<dyn MetadataStore>, enricher: PipelineEnricher) -> Self {
        Self { store, enricher }
    }

    /// Create a new pipeline owned by the actor
    pub async fn create_pipeline(&self, actor: &Actor, req: CreatePipeline) -> Result<Pipeline> {
        validate_name(&req.name)?;

        let pipeline = self.store.create_pipeline(actor, req).await?;

        tracing::info!("Pipeline created: {} ({})", pipeline.name, pipeline.id);

        Ok(pipeline)
    }

    /// Rename a pipeline and replace its governance tags
    pub async fn update_pipeline(&self, id: Uuid, req: UpdatePipeline) -> Result<Pipeline> {
        validate_name(&req.name)?;

        let updated = self.store.update_pipeline(id, &req).await?;
        if !updated {
            return Err(PipelineError::NotFound(id));
        }

        self.get_pipeline(id).await
    }

    /// Get the stored pipeline without enrichment
    pub async fn get_pipeline(&self, id: Uuid) -> Result<Pipeline> {
        self.store
            .get_pipeline(id)
            .await?
            .ok_or(PipelineError::NotFound(id))
    }

    /// List the actor's workspace pipelines with live status and owner
    ///
    /// Only the store read can fail; lookup failures blank fields instead.
    pub async fn list_pipelines(&self, actor: &Actor) -> Result<Vec<PipelineMetadata>> {
        let rows = self.store.list_pipeline_rows(actor.workspace_id).await?;
        tracing::debug!("Enriching {} pipelines", rows.len());

        Ok(self.enricher.enrich_all(rows).await)
    }

    /// Get one pipeline with live status and owner, failing if either lookup fails
    pub async fn get_pipeline_detail(&self, actor: &Actor, id: Uuid) -> Result<PipelineDetail> {
        let detail = self
            .store
            .get_pipeline_detail(id, actor.workspace_id)
            .await?
            .ok_or(PipelineError::NotFound(id))?;

        self.enricher.enrich_one(detail).await
    }

    /// Move a pipeline to a new lifecycle status
    pub async fn update_pipeline_status(&self, id: Uuid, status: PipelineStatus) -> Result<()> {
        let current = self.get_pipeline(id).await?;

        if !current.status.can_transition_to(status) {
            return Err(PipelineError::ValidationError(format!(
                "Cannot move pipeline from '{}' to '{}'",
                current.status, status
            )));
        }

        if !self.store.update_pipeline_status(id, status).await? {
            return Err(PipelineError::NotFound(id));
        }

        tracing::info!("Pipeline {} status: {}", id, status);

        Ok(())
    }

    /// Delete the pipeline row without touching the execution service
    pub async fn delete_pipeline(&self, id: Uuid) -> Result<()> {
        let deleted = self.store.delete_pipeline(id).await?;

        if !deleted {
            return Err(PipelineError::NotFound(id));
        }

        tracing::info!("Pipeline deleted: {}", id);

        Ok(())
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PipelineError::ValidationError(
            "Pipeline name cannot be empty".to_string(),
        ));
    }

    if name.len() > 255 {
        return Err(PipelineError::ValidationError(
            "Pipeline name is too long (max 255 characters)".to_string(),
        ));
    }

    Ok(())
}
