//! Importer Server - Main entry point

use anyhow::Result;
use importer_common::logging::{init_logging, LogConfig};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use importer_server::{
    api,
    config::Config,
    features::{imports::ImportState, FeatureState},
    ingest::{
        IngestionWorker, JobQueue, JobScheduler, PgJobQueue, PgProgressStore, PgRecordSink,
        ProgressStore,
    },
    webhooks::{HttpDeliverer, PgSubscriptionSource, WebhookDispatcher},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("importer-server")
        .filter_directives("importer_server=debug,tower_http=debug,sqlx=info")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env_with(log_config.clone()).unwrap_or(log_config);

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&log_config)?;

    info!("Starting Importer Server");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        workers = config.ingest.worker_count,
        batch_size = config.ingest.batch_size,
        "Configuration loaded"
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    info!("Database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    let progress: Arc<dyn ProgressStore> = Arc::new(PgProgressStore::new(db_pool.clone()));
    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(db_pool.clone()));
    let dispatcher = Arc::new(WebhookDispatcher::new(
        Arc::new(PgSubscriptionSource::new(db_pool.clone())),
        Arc::new(HttpDeliverer::new(&config.ingest.webhook)?),
    ));

    let scheduler = if config.ingest.enabled {
        let worker = IngestionWorker::new(
            Arc::new(PgRecordSink::new(db_pool.clone())),
            progress.clone(),
            dispatcher.clone(),
            config.ingest.clone(),
        );
        let handle =
            JobScheduler::new(config.ingest.clone(), Arc::new(worker), queue.clone()).start();
        info!(workers = config.ingest.worker_count, "Import workers started");
        Some(handle)
    } else {
        info!("Ingestion is disabled (INGEST_ENABLED=false)");
        None
    };

    let state = FeatureState {
        db: db_pool.clone(),
        imports: ImportState {
            progress,
            queue,
            upload_dir: config.ingest.upload_dir.clone(),
        },
        dispatcher,
    };
    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = scheduler {
        let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
        if tokio::time::timeout(timeout, handle.shutdown()).await.is_err() {
            tracing::warn!(
                timeout_secs = config.server.shutdown_timeout_secs,
                "Import workers did not stop in time"
            );
        }
    }

    db_pool.close().await;
    info!("Server shut down gracefully");

    Ok(())
}

async fn shutdown_signal() {
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
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
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
}
