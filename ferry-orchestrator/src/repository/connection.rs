//! Connection Repository
//!
//! Database operations on connection rows, including the provisional
//! `pending_*` columns the creation saga writes around its remote call.

use chrono::{DateTime, Utc};
use ferry_core::domain::connection::{
    Connection, ConnectionRefs, ConnectionResult, PendingRemote, Schedule,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Time unit stored when a connection has no schedule
const UNSCHEDULED_TIME_UNIT: &str = "minutes";

/// Resolve a source/destination pair to everything the saga needs
///
/// Read-only. `None` when either side does not exist in the workspace.
pub async fn resolve_refs(
    pool: &PgPool,
    source_id: Uuid,
    destination_id: Uuid,
    workspace_id: i64,
) -> Result<Option<ConnectionRefs>, sqlx::Error> {
    let row = sqlx::query_as::<_, RefsRow>(
        r#"
        SELECT s.connection_id, c.pipeline_id, p.name AS pipeline_name,
               s.id AS source_id, s.remote_id AS remote_source_id,
               d.id AS destination_id, d.remote_id AS remote_destination_id
        FROM sources s
        JOIN connections c ON c.id = s.connection_id
        JOIN pipelines p ON p.id = c.pipeline_id
        CROSS JOIN destinations d
        WHERE s.id = $1 AND d.id = $2
          AND p.workspace_id = $3 AND d.workspace_id = $3
        "#,
    )
    .bind(source_id)
    .bind(destination_id)
    .bind(workspace_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Find a connection by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Connection>, sqlx::Error> {
    let row = sqlx::query_as::<_, ConnectionRow>(&format!("{} WHERE id = $1", CONNECTION_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.into()))
}

/// Find the connection row of a pipeline
pub async fn find_by_pipeline(
    pool: &PgPool,
    pipeline_id: Uuid,
) -> Result<Option<Connection>, sqlx::Error> {
    let row = sqlx::query_as::<_, ConnectionRow>(&format!(
        "{} WHERE pipeline_id = $1",
        CONNECTION_SELECT
    ))
    .bind(pipeline_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List all connections
pub async fn list_all(pool: &PgPool) -> Result<Vec<Connection>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ConnectionRow>(&format!(
        "{} ORDER BY created_at DESC",
        CONNECTION_SELECT
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Connections whose provisional marker was set before `older_than`
pub async fn find_pending(
    pool: &PgPool,
    older_than: DateTime<Utc>,
) -> Result<Vec<Connection>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ConnectionRow>(&format!(
        "{} WHERE pending_since IS NOT NULL AND pending_since < $1 ORDER BY pending_since",
        CONNECTION_SELECT
    ))
    .bind(older_than)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Remote source and destination ids of a connection's pending create
pub async fn find_pending_remote_pair(
    pool: &PgPool,
    connection_id: Uuid,
) -> Result<Option<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT s.remote_id, d.remote_id
        FROM connections c
        JOIN sources s ON s.connection_id = c.id
        JOIN destinations d ON d.id = c.pending_destination_id
        WHERE c.id = $1
        "#,
    )
    .bind(connection_id)
    .fetch_optional(pool)
    .await
}

/// Record that a remote create is about to be attempted
///
/// Only an unprovisioned row without a marker is claimed, so concurrent
/// creates for one connection cannot both reach the execution service.
pub async fn mark_pending(
    pool: &PgPool,
    connection_id: Uuid,
    destination_id: Uuid,
    remote_workspace_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE connections
        SET pending_since = $1, pending_destination_id = $2,
            pending_remote_workspace_id = $3, pending_remote_connection_id = NULL
        WHERE id = $4 AND remote_connection_id IS NULL AND pending_since IS NULL
        "#,
    )
    .bind(Utc::now())
    .bind(destination_id)
    .bind(remote_workspace_id)
    .bind(connection_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Persist a successful remote create and link the destination, atomically
///
/// Clears the provisional marker in the same transaction.
pub async fn commit_result(pool: &PgPool, result: &ConnectionResult) -> Result<bool, sqlx::Error> {
    let (units, time_unit) = schedule_columns(result.schedule.as_ref());

    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE connections
        SET remote_connection_id = $1, remote_status = $2,
            schedule_units = $3, schedule_time_unit = $4,
            owner = $5, workspace_id = $6,
            pending_since = NULL, pending_destination_id = NULL,
            pending_remote_workspace_id = NULL, pending_remote_connection_id = NULL
        WHERE id = $7
        "#,
    )
    .bind(&result.remote_connection_id)
    .bind(&result.remote_status)
    .bind(units)
    .bind(time_unit)
    .bind(result.owner)
    .bind(result.workspace_id)
    .bind(result.connection_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO connections_destinations (connection_id, destination_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(result.connection_id)
    .bind(result.destination_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(true)
}

/// Keep a remote id that could not be committed, for the reconciler
pub async fn record_unrecorded_remote(
    pool: &PgPool,
    connection_id: Uuid,
    remote_connection_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE connections
        SET pending_remote_connection_id = $1,
            pending_since = COALESCE(pending_since, $2)
        WHERE id = $3
        "#,
    )
    .bind(remote_connection_id)
    .bind(Utc::now())
    .bind(connection_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Drop the provisional marker without touching the committed columns
pub async fn clear_pending(pool: &PgPool, connection_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE connections
        SET pending_since = NULL, pending_destination_id = NULL,
            pending_remote_workspace_id = NULL, pending_remote_connection_id = NULL
        WHERE id = $1
        "#,
    )
    .bind(connection_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Store the schedule and status the remote update answered with
///
/// A missing schedule is stored as `NULL` units in `minutes`. The connection
/// is no longer on its first run afterwards.
pub async fn update_schedule(
    pool: &PgPool,
    connection_id: Uuid,
    schedule: Option<&Schedule>,
    remote_status: &str,
) -> Result<bool, sqlx::Error> {
    let (units, time_unit) = schedule_columns(schedule);

    let result = sqlx::query(
        r#"
        UPDATE connections
        SET schedule_units = $1, schedule_time_unit = $2,
            remote_status = $3, is_first_run = FALSE
        WHERE id = $4
        "#,
    )
    .bind(units)
    .bind(time_unit)
    .bind(remote_status)
    .bind(connection_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn schedule_columns(schedule: Option<&Schedule>) -> (Option<i32>, String) {
    match schedule {
        Some(s) => (Some(s.units), s.time_unit.clone()),
        None => (None, UNSCHEDULED_TIME_UNIT.to_string()),
    }
}

const CONNECTION_SELECT: &str = r#"
    SELECT id, pipeline_id, remote_connection_id, remote_status,
           schedule_units, schedule_time_unit, is_first_run, owner, workspace_id,
           created_at, pending_since, pending_destination_id,
           pending_remote_workspace_id, pending_remote_connection_id
    FROM connections
"#;

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ConnectionRow {
    id: Uuid,
    pipeline_id: Uuid,
    remote_connection_id: Option<String>,
    remote_status: Option<String>,
    schedule_units: Option<i32>,
    schedule_time_unit: Option<String>,
    is_first_run: bool,
    owner: i64,
    workspace_id: i64,
    created_at: DateTime<Utc>,
    pending_since: Option<DateTime<Utc>>,
    pending_destination_id: Option<Uuid>,
    pending_remote_workspace_id: Option<String>,
    pending_remote_connection_id: Option<String>,
}

impl From<ConnectionRow> for Connection {
    fn from(row: ConnectionRow) -> Self {
        let pending = match (
            row.pending_since,
            row.pending_destination_id,
            row.pending_remote_workspace_id,
        ) {
            (Some(since), Some(destination_id), Some(remote_workspace_id)) => {
                Some(PendingRemote {
                    since,
                    destination_id,
                    remote_workspace_id,
                    remote_connection_id: row.pending_remote_connection_id,
                })
            }
            _ => None,
        };

        Connection {
            id: row.id,
            pipeline_id: row.pipeline_id,
            remote_connection_id: row.remote_connection_id,
            remote_status: row.remote_status,
            schedule_units: row.schedule_units,
            schedule_time_unit: row.schedule_time_unit,
            is_first_run: row.is_first_run,
            owner: row.owner,
            workspace_id: row.workspace_id,
            created_at: row.created_at,
            pending,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefsRow {
    connection_id: Uuid,
    pipeline_id: Uuid,
    pipeline_name: String,
    source_id: Uuid,
    remote_source_id: String,
    destination_id: Uuid,
    remote_destination_id: String,
}

impl From<RefsRow> for ConnectionRefs {
    fn from(row: RefsRow) -> Self {
        ConnectionRefs {
            connection_id: row.connection_id,
            pipeline_id: row.pipeline_id,
            pipeline_name: row.pipeline_name,
            source_id: row.source_id,
            remote_source_id: row.remote_source_id,
            destination_id: row.destination_id,
            remote_destination_id: row.remote_destination_id,
        }
    }
}
