//! Pipeline Repository
//!
//! Handles all database operations related to pipelines and the read-only
//! list/detail projections joined with their source, destination and
//! connection.

use ferry_core::domain::identity::Actor;
use ferry_core::domain::pipeline::{Pipeline, PipelineDetail, PipelineMetadata, PipelineStatus};
use ferry_core::dto::pipeline::{CreatePipeline, UpdatePipeline};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new pipeline together with its (not yet provisioned) connection row
pub async fn create(
    pool: &PgPool,
    actor: &Actor,
    req: CreatePipeline,
) -> Result<Pipeline, sqlx::Error> {
    let now = chrono::Utc::now();

    let pipeline = Pipeline {
        id: Uuid::new_v4(),
        name: req.name,
        governance: req.governance,
        status: PipelineStatus::Active,
        owner: actor.user_id,
        workspace_id: actor.workspace_id,
        created_at: now,
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO pipelines (id, name, governance, status, owner, workspace_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(pipeline.id)
    .bind(&pipeline.name)
    .bind(&pipeline.governance)
    .bind(pipeline.status.as_str())
    .bind(pipeline.owner)
    .bind(pipeline.workspace_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO connections (id, pipeline_id, is_first_run, owner, workspace_id, created_at)
        VALUES ($1, $2, TRUE, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(pipeline.id)
    .bind(pipeline.owner)
    .bind(pipeline.workspace_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(pipeline)
}

/// Find a pipeline by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Pipeline>, sqlx::Error> {
    let row = sqlx::query_as::<_, PipelineRow>(
        r#"
        SELECT id, name, governance, status, owner, workspace_id, created_at
        FROM pipelines
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Pipeline::try_from).transpose()
}

/// Update name and governance tags
pub async fn update(pool: &PgPool, id: Uuid, req: &UpdatePipeline) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE pipelines
        SET name = $1, governance = $2
        WHERE id = $3
        "#,
    )
    .bind(&req.name)
    .bind(&req.governance)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Set the lifecycle status of a pipeline
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: PipelineStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE pipelines SET status = $1 WHERE id = $2")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a pipeline by ID; its connection and source rows cascade
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// List the pipelines of a workspace as un-enriched metadata rows
pub async fn list_metadata(
    pool: &PgPool,
    workspace_id: i64,
) -> Result<Vec<PipelineMetadata>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProjectionRow>(&format!(
        "{} WHERE p.workspace_id = $1 AND p.status <> $2 ORDER BY p.created_at DESC",
        PROJECTION_SELECT
    ))
    .bind(workspace_id)
    .bind(PipelineStatus::Deleted.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Fetch the detail projection of one pipeline in a workspace
pub async fn find_detail(
    pool: &PgPool,
    id: Uuid,
    workspace_id: i64,
) -> Result<Option<PipelineDetail>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProjectionRow>(&format!(
        "{} WHERE p.id = $1 AND p.workspace_id = $2 LIMIT 1",
        PROJECTION_SELECT
    ))
    .bind(id)
    .bind(workspace_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

const PROJECTION_SELECT: &str = r#"
    SELECT p.id, p.name, p.governance, p.status, p.owner, p.created_at,
           s.id AS source_id, s.name AS source_name,
           d.id AS destination_id, d.name AS destination_name,
           c.id AS connection_id, c.remote_connection_id
    FROM pipelines p
    LEFT JOIN connections c ON c.pipeline_id = p.id
    LEFT JOIN sources s ON s.connection_id = c.id
    LEFT JOIN connections_destinations cd ON cd.connection_id = c.id
    LEFT JOIN destinations d ON d.id = cd.destination_id
"#;

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    name: String,
    governance: Vec<String>,
    status: String,
    owner: i64,
    workspace_id: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<PipelineRow> for Pipeline {
    type Error = sqlx::Error;

    fn try_from(row: PipelineRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<PipelineStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(Pipeline {
            id: row.id,
            name: row.name,
            governance: row.governance,
            status,
            owner: row.owner,
            workspace_id: row.workspace_id,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProjectionRow {
    id: Uuid,
    name: String,
    governance: Vec<String>,
    status: String,
    owner: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    source_id: Option<Uuid>,
    source_name: Option<String>,
    destination_id: Option<Uuid>,
    destination_name: Option<String>,
    connection_id: Option<Uuid>,
    remote_connection_id: Option<String>,
}

impl From<ProjectionRow> for PipelineMetadata {
    fn from(row: ProjectionRow) -> Self {
        PipelineMetadata {
            pipeline_id: row.id,
            pipeline_name: row.name,
            pipeline_governance: row.governance,
            pipeline_status: row.status,
            source_id: row.source_id,
            source_name: row.source_name,
            destination_id: row.destination_id,
            destination_name: row.destination_name,
            connection_id: row.connection_id,
            remote_connection_id: row.remote_connection_id,
            owner_id: row.owner,
            status: None,
            last_run: None,
            owner: None,
        }
    }
}

impl From<ProjectionRow> for PipelineDetail {
    fn from(row: ProjectionRow) -> Self {
        PipelineDetail {
            pipeline_id: row.id,
            name: row.name,
            governance: row.governance,
            created_at: row.created_at,
            pipeline_status: row.status,
            source_id: row.source_id,
            source_name: row.source_name,
            destination_id: row.destination_id,
            destination_name: row.destination_name,
            connection_id: row.connection_id,
            remote_connection_id: row.remote_connection_id,
            owner_id: row.owner,
            status: None,
            last_run: None,
            owner: None,
        }
    }
}
