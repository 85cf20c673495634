//! GDELT Collector - Main entry point

use anyhow::{Context, Result};
use collector_common::logging::{init_logging, LogConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use collector_server::{
    api::{self, AppState},
    config::Config,
    ingest::{self, ArchiveProcessor, Coordinator, EventBus},
    publish::{MessagePublisher, TopicResolver},
    storage::{ObjectStore, StorageConfig},
    store::{HashStore, StatusStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::from_env().unwrap_or_default();
    init_logging(&log_config)?;

    info!("Starting GDELT collector");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        manifest = %config.manifest.url,
        "Configuration loaded"
    );

    // Key-value store: shared connection for hash provenance, send status
    // and the health probe.
    let redis_client =
        redis::Client::open(config.redis.url.as_str()).context("Invalid Redis URL")?;
    let redis_conn = redis_client
        .get_connection_manager()
        .await
        .context("Failed to connect to Redis")?;
    info!("Redis connection established");

    let hash_store = HashStore::new(redis_conn.clone(), config.redis.hash_ttl_secs);
    let status_store = StatusStore::new(redis_conn.clone(), config.redis.status_ttl_secs);

    // Object store init verifies (or creates) the bucket; failure here is
    // fatal so the collector never accepts work it cannot store.
    let storage_config = StorageConfig::from_env()?;
    let object_store = ObjectStore::new(storage_config)
        .await
        .context("Failed to initialize object store")?;

    // Publishing side: topic resolution, Kafka producer, event listener.
    let resolver = TopicResolver::new(&config.kafka);
    let publisher = MessagePublisher::new(&config.kafka, status_store.clone())?;
    let (event_bus, event_rx) = EventBus::new();
    let listener_handle = ingest::events::spawn_listener(
        event_rx,
        resolver.clone(),
        status_store.clone(),
        publisher.clone(),
    );

    // Ingestion side: per-archive pipelines behind the tick coordinator.
    let http = ingest::download::build_http_client(&config.manifest)
        .context("Failed to build HTTP client")?;
    let processor = ArchiveProcessor::new(
        config.ingest.download_dir.clone(),
        http.clone(),
        hash_store.clone(),
        object_store,
        event_bus,
    );
    let coordinator = Arc::new(Coordinator::new(
        http,
        config.manifest.clone(),
        hash_store,
        processor,
    ));

    let check_handle =
        ingest::scheduler::spawn_check_loop(Arc::clone(&coordinator), config.ingest.check_interval());
    let retry_handle = ingest::scheduler::spawn_retry_loop(
        status_store,
        resolver,
        publisher,
        config.ingest.retry_interval(),
    );

    // REST control surface.
    let state = AppState {
        coordinator,
        redis: redis_conn,
    };
    let app = api::router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    // Stop the periodic loops; in-flight pipelines are dropped when the
    // runtime shuts down, and their extraction-dir guards clean up.
    check_handle.abort();
    retry_handle.abort();
    listener_handle.abort();

    info!("Collector shut down gracefully");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM, then allow in-flight requests to finish.
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
}
