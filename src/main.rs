use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use snaplink::config::{Config, StorageBackend};
use snaplink::events::{EventLogWriter, EventPublisher};
use snaplink::storage::{FileStorage, MemoryStorage, Storage};
use snaplink::{create_app, AppOptions, LinkService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("snaplink=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage: Arc<dyn Storage> = match config.storage.backend {
        StorageBackend::File => {
            info!("Using file storage: {}", config.storage.data_file);
            Arc::new(FileStorage::new(&config.storage.data_file).await?)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; links are lost on restart");
            Arc::new(MemoryStorage::new())
        }
    };
    storage.init().await?;

    // Start the event log writer
    let (events, event_rx) = EventPublisher::channel(config.events.buffer_size);
    let writer = EventLogWriter::new(event_rx, &config.events.log_file).spawn();

    let service = Arc::new(
        LinkService::new(storage, events.clone()).with_code_length(config.short_code_length),
    );

    let app = create_app(
        service,
        events,
        AppOptions {
            cors_origin: Some(config.cors_origin.clone()),
            public_base_url: config.public_base_url.clone(),
        },
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("🚀 Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // the router held the last publishers; let the writer drain
    match tokio::time::timeout(Duration::from_secs(5), writer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "event log writer did not shut down cleanly"),
        Err(_) => tracing::warn!("timed out flushing the event log"),
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    info!("Shutdown signal received, stopping server");
}
