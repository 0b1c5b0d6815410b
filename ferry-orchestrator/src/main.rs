use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ferry_client::{EcsClient, IdentityClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::Config;
use crate::repository::PgStore;
use crate::service::connection::ConnectionOrchestrator;
use crate::service::enrichment::PipelineEnricher;
use crate::service::pipeline::PipelineService;
use crate::service::reconcile::Reconciler;
use crate::workflow::LocalWorkflowEngine;

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
pub mod workflow;

#[cfg(test)]
pub mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferry_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ferry Orchestrator...");

    let config = Config::parse();
    config.validate()?;

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    // One HTTP client for both remote services so they share the pool and timeout
    let http = reqwest::Client::builder()
        .timeout(config.ecs_request_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let ecs = Arc::new(EcsClient::with_client(&config.ecs_url, http.clone()));
    let identity = Arc::new(IdentityClient::with_client(&config.identity_url, http));
    let store = Arc::new(PgStore::new(pool));

    let enricher = PipelineEnricher::new(
        ecs.clone(),
        identity,
        config.max_concurrent_enrichments,
        config.enrichment_timeout(),
    );
    let pipelines = Arc::new(PipelineService::new(store.clone(), enricher));
    let connections = Arc::new(ConnectionOrchestrator::new(store.clone(), ecs.clone()));
    let workflows = Arc::new(LocalWorkflowEngine::new(
        connections.clone(),
        config.workflow_timeout(),
    ));

    let reconciler = Arc::new(Reconciler::new(store, ecs, config.reconcile_grace()));
    tokio::spawn(reconciler.run(config.reconcile_interval()));

    // Build router with all API endpoints
    let app = api::create_router(AppState {
        pipelines,
        connections,
        workflows,
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
