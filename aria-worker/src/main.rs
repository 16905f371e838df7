// Worker binary entry point: wires the queue engine to the catalogue's
// job table and the generation service, then polls until shutdown.

mod handlers;

use anyhow::Result;
use aria_core::config::Settings;
use aria_core::db::{DbPool, JobRepository};
use aria_core::queue::JobQueue;
use aria_core::registry::{HandlerRegistry, JobHandler};
use aria_core::store::JobStore;
use handlers::GenerationHandler;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aria_worker=info,aria_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting aria generation worker");

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    info!(
        poll_interval_ms = settings.queue.poll_interval_ms,
        max_attempts = settings.queue.max_attempts,
        auto_models = ?settings.queue.auto_models,
        "Configuration loaded"
    );

    // Initialize database connection pool
    let db_pool = DbPool::new(&settings.database).await.map_err(|e| {
        error!(error = %e, "Failed to initialize database pool");
        anyhow::anyhow!("Database initialization error: {}", e)
    })?;

    // Note: migrations are run separately before starting the worker.
    let store: Arc<dyn JobStore> = Arc::new(JobRepository::new(db_pool.clone()));
    info!("Job store initialized");

    // Register handlers before the queue starts; the generation service
    // backs every generation job type the catalogue produces.
    let generation: Arc<dyn JobHandler> = Arc::new(
        GenerationHandler::new(&settings.generation)
            .map_err(|e| anyhow::anyhow!("Generation handler initialization error: {}", e))?,
    );
    let mut registry = HandlerRegistry::new();
    registry.register("lyrics", Arc::clone(&generation));
    registry.register("description", Arc::clone(&generation));
    info!(handlers = registry.len(), "Handler registry initialized");

    // Start the queue: recovery sweep first, then the polling scheduler.
    let queue = JobQueue::new(settings.queue.clone(), store, Arc::new(registry));
    queue.start().await.map_err(|e| {
        error!(error = %e, "Failed to start job queue");
        anyhow::anyhow!("Job queue startup error: {}", e)
    })?;

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C signal, initiating graceful shutdown");

    // Awaits the scheduler loop; an execution already in flight finishes.
    queue.stop().await;
    db_pool.close().await;

    info!("Worker stopped");
    Ok(())
}
