use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create pipelines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            governance TEXT[] NOT NULL DEFAULT '{}',
            status VARCHAR(50) NOT NULL,
            owner BIGINT NOT NULL,
            workspace_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create connections table; the pending_* columns hold the saga marker
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS connections (
            id UUID PRIMARY KEY,
            pipeline_id UUID NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
            remote_connection_id VARCHAR(255),
            remote_status VARCHAR(50),
            schedule_units INTEGER,
            schedule_time_unit VARCHAR(50),
            is_first_run BOOLEAN NOT NULL DEFAULT TRUE,
            owner BIGINT NOT NULL,
            workspace_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            pending_since TIMESTAMPTZ,
            pending_destination_id UUID,
            pending_remote_workspace_id VARCHAR(255),
            pending_remote_connection_id VARCHAR(255)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create sources table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id UUID PRIMARY KEY,
            connection_id UUID NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
            name VARCHAR(255) NOT NULL,
            remote_id VARCHAR(255) NOT NULL,
            remote_definition_id VARCHAR(255) NOT NULL,
            owner BIGINT NOT NULL,
            workspace_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create destinations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS destinations (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            remote_id VARCHAR(255) NOT NULL,
            remote_definition_id VARCHAR(255) NOT NULL,
            owner BIGINT NOT NULL,
            workspace_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create connection -> destination links
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS connections_destinations (
            connection_id UUID NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
            destination_id UUID NOT NULL REFERENCES destinations(id) ON DELETE CASCADE,
            PRIMARY KEY (connection_id, destination_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for the list and reconcile queries
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipelines_workspace ON pipelines(workspace_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_connections_pipeline_id ON connections(pipeline_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sources_connection_id ON sources(connection_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_connections_pending ON connections(pending_since) WHERE pending_since IS NOT NULL",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
