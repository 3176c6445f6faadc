use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_core::{
    create_watermark_store, load_config, validate_config, CatalogRefreshTask, CatalogSource,
    CatalogStore, Config, ContentFanoutIndexer, CrawlSettings, HistoricalCrawlWalker,
    HttpMatchIndex, MangaDexSource, MatchIndex, RateGovernor, ReconciliationTask,
    SqliteCatalogStore, TaskScheduler, WatermarkStore,
};

use folio_server::api::create_router;
use folio_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("FOLIO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Database path: {:?}", config.database.path);
    info!("Watermark backend: {:?}", config.watermark.backend);

    // Local mirror
    let store: Arc<dyn CatalogStore> = Arc::new(
        SqliteCatalogStore::new(&config.database.path)
            .context("Failed to open catalog store")?,
    );

    let scheduler = Arc::new(build_scheduler(&config, Arc::clone(&store))?);
    if scheduler.job_names().is_empty() {
        info!("All jobs disabled, scheduler idle");
    } else {
        info!("Starting scheduler with jobs: {:?}", scheduler.job_names());
        scheduler.start().await;
    }

    // Create application state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        Arc::clone(&scheduler),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stopping scheduler...");
    scheduler.shutdown().await;
    info!("Server shut down");

    Ok(())
}

/// Register every enabled job with a fresh scheduler.
fn build_scheduler(config: &Config, store: Arc<dyn CatalogStore>) -> Result<TaskScheduler> {
    let source: Arc<dyn CatalogSource> = Arc::new(
        MangaDexSource::new(&config.source).context("Failed to create catalog source client")?,
    );
    let index: Arc<dyn MatchIndex> = Arc::new(
        HttpMatchIndex::new(&config.index).context("Failed to create match index client")?,
    );

    let mut scheduler = TaskScheduler::new();

    if config.jobs.crawler.enabled {
        let watermarks: Arc<dyn WatermarkStore> = Arc::from(
            create_watermark_store(&config.watermark, &config.database.path)
                .context("Failed to open watermark store")?,
        );
        let fanout = ContentFanoutIndexer::new(
            Arc::clone(&index),
            config.index.source_name.clone(),
            config.fanout.chunk_size,
        );
        let walker = HistoricalCrawlWalker::new(
            Arc::clone(&source),
            watermarks,
            fanout,
            RateGovernor::from_config(&config.governor),
            CrawlSettings::from_config(config),
        );
        scheduler.add_job(Box::new(walker))?;
    }

    if config.jobs.refresher.enabled {
        scheduler.add_job(Box::new(CatalogRefreshTask::from_config(
            Arc::clone(&source),
            Arc::clone(&store),
            &config.jobs.refresher,
        )))?;
    }

    if config.jobs.reconciliation.enabled {
        scheduler.add_job(Box::new(ReconciliationTask::from_config(
            index,
            store,
            &config.jobs.reconciliation,
        )))?;
    }

    Ok(scheduler)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
