//! Tool Sync Worker Service
//!
//! Reconciles the Qdrant collections with the tool catalog in MongoDB.
//!
//! ## Architecture
//!
//! ```text
//! MongoDB (tools)
//!   ↓ (drifted tools, every SWEEP_INTERVAL_SECS)
//! SweepScheduler
//!   ↓ (per tool, bounded concurrency)
//! SyncService ── OpenAI embeddings (cached)
//!   ↓
//! Qdrant (tools / functionality / usecases / interface)
//! ```
//!
//! ## Features
//!
//! - Content-hash change detection, no redundant embedding calls
//! - In-call retries for transient failures, exponential backoff across sweeps
//! - Prometheus metrics on `METRICS_PORT`
//! - Graceful shutdown that waits for the in-flight sweep

pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use domain_tool_sync::{SweepScheduler, SyncService};
use domain_tools::MongoToolRepository;
use domain_vector::{CachedEmbeddingProvider, EmbeddingProvider, OpenAIProvider, QdrantRepository};
use eyre::{Result, WrapErr};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use config::Config;

/// Run the tool sync worker
///
/// This is the main entry point for the worker. It:
/// 1. Sets up structured logging (env-aware: JSON for prod, pretty for dev)
/// 2. Installs the Prometheus exporter
/// 3. Connects to MongoDB, Qdrant and the embedding provider
/// 4. Creates missing vector collections
/// 5. Runs the sweep scheduler until SIGINT/SIGTERM
///
/// # Errors
///
/// Returns an error if configuration is invalid or a backing store is
/// unreachable at startup.
pub async fn run() -> Result<()> {
    let config = Config::from_env()?;
    core_config::tracing::init_tracing(&config.environment, env!("CARGO_PKG_NAME"));

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Starting tool sync worker"
    );
    info!("Environment: {:?}", config.environment);

    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .wrap_err("Failed to install Prometheus exporter")?;
    info!(port = config.metrics_port, "Metrics exporter listening");

    info!("Connecting to MongoDB...");
    let mongo_client = database::mongodb::connect_from_config_with_retry(&config.mongodb, None)
        .await
        .wrap_err("Failed to connect to MongoDB")?;
    let db = mongo_client.database(config.mongodb.database());
    let tools = MongoToolRepository::with_collection(db, &config.tools_collection);
    info!(
        database = config.mongodb.database(),
        collection = %config.tools_collection,
        "Connected to MongoDB"
    );

    let vectors = QdrantRepository::new(config.qdrant.clone())
        .await
        .wrap_err("Failed to create Qdrant client")?;

    let openai: Arc<dyn EmbeddingProvider> = Arc::new(
        OpenAIProvider::new(config.openai.clone()).wrap_err("Failed to create OpenAI client")?,
    );
    let embeddings: Arc<dyn EmbeddingProvider> = if config.embedding_cache_capacity > 0 {
        info!(capacity = config.embedding_cache_capacity, "Embedding cache enabled");
        Arc::new(CachedEmbeddingProvider::new(
            openai,
            config.embedding_cache_capacity,
        ))
    } else {
        openai
    };

    let model = config.sync.model;
    let service = SyncService::new(
        Arc::new(tools),
        Arc::new(vectors),
        embeddings,
        config.sync.clone(),
    );

    let created = service
        .ensure_collections(model.dimension())
        .await
        .wrap_err("Failed to prepare vector collections")?;
    if !created.is_empty() {
        info!(collections = ?created, "Created vector collections");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let scheduler = Arc::new(SweepScheduler::new(Arc::new(service), config.sweep.clone()));
    scheduler.run(shutdown_rx).await;

    info!("Tool sync worker stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .wrap_err("Failed to install Ctrl+C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("Failed to install signal handler")?
            .recv()
            .await;
        Ok::<(), eyre::Report>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        },
        result = terminate => {
            result?;
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
