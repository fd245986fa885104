use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::database::{HealthStore, MemoryStore, PgStore};
use crate::services::uploads::sweep_expired_uploads;
use crate::storage::{ObjectStorage, S3Storage};
use crate::{routes, AppState};

#[derive(Parser)]
#[command(name = "healthtrack-api")]
#[command(about = "Health Track API - personal health tracks, events and attachments")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Apply database migrations and exit")]
    Migrate,

    #[command(about = "Remove expired pending uploads and their objects, once")]
    SweepUploads,
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    config.validate().map_err(anyhow::Error::msg).context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Migrate => migrate(&config).await,
        Commands::SweepUploads => sweep_once(config).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let storage: Arc<dyn ObjectStorage> = Arc::new(S3Storage::from_config(&config.storage).await);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let sweep_every = Duration::from_secs(config.storage.sweep_interval_secs.max(1));

    info!("Starting Health Track API in {:?} mode", config.environment);
    let state = AppState::new(config, store, storage);
    spawn_sweeper(state.clone(), sweep_every);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, routes::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let store = PgStore::connect(&config.database)
        .await
        .context("DATABASE_URL is required to run migrations")?;
    store.migrate().await?;
    store.close().await;
    Ok(())
}

async fn sweep_once(config: AppConfig) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let storage = S3Storage::from_config(&config.storage).await;

    let report = sweep_expired_uploads(store.as_ref(), &storage, chrono::Utc::now()).await?;
    info!(
        removed = report.removed,
        storage_failures = report.storage_failures,
        "Sweep finished"
    );
    Ok(())
}

/// PostgreSQL when `DATABASE_URL` is set, otherwise the in-memory store.
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn HealthStore>> {
    match &config.database.url {
        Some(_) => {
            let store = PgStore::connect(&config.database).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Periodic pending-upload reconciliation for the life of the process.
fn spawn_sweeper(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_expired_uploads(state.store.as_ref(), state.storage.as_ref(), chrono::Utc::now()).await {
                error!("Upload sweep failed: {}", e);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
