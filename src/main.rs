//! PartView Server: CAD and mesh ingestion for the web viewer
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use partview_api::{AppState, build_router};
use partview_converter::{ConversionMetrics, StrategyRegistry};
use partview_core::config::AppConfig;
use partview_core::error::AppError;
use partview_database::Stores;
use partview_service::{IngestionDispatcher, IngestionPipeline};

#[tokio::main]
async fn main() {
    let env = std::env::var("PARTVIEW_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting PartView v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Create data directories ──────────────────────────
    create_data_directories(&config).await?;

    // ── Step 2: Record store (+ migrations for PostgreSQL) ───────
    let stores = Stores::open(&config.database).await?;

    // ── Step 3: Conversion strategies and pipeline ───────────────
    let strategies = StrategyRegistry::from_config(&config.converter);
    let metrics = Arc::new(ConversionMetrics::new());
    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::clone(&stores.records),
        strategies,
        metrics,
        config.converter.keep_intermediates,
    ));

    // ── Step 4: Ingestion dispatcher ─────────────────────────────
    let dispatcher = Arc::new(IngestionDispatcher::new(
        pipeline,
        config.worker.max_concurrent_conversions,
    ));
    tracing::info!(
        max_concurrent = config.worker.max_concurrent_conversions,
        timeout_seconds = config.converter.process_timeout_seconds,
        "Ingestion dispatcher ready"
    );

    // ── Step 5: Build and start HTTP server ──────────────────────
    let addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let app = build_router(AppState::new(config, stores, Arc::clone(&dispatcher)));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("PartView server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 6: Let running conversions finish ───────────────────
    dispatcher.shutdown(grace).await;

    tracing::info!("PartView server shut down gracefully");
    Ok(())
}

/// Create required data directories
async fn create_data_directories(config: &AppConfig) -> Result<(), AppError> {
    let dirs = [
        config.storage.upload_dir(),
        config.storage.temp_dir(),
        config.storage.converted_dir(),
    ];

    for dir in &dirs {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            AppError::internal(format!("Failed to create dir '{}': {}", dir.display(), e))
        })?;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
