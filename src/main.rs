//! TestTrust Server: live exam session coordination.
//!
//! Main entry point that wires all crates together and starts the server.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing_subscriber::{EnvFilter, fmt};

use testtrust_api::AppState;
use testtrust_core::config::AppConfig;
use testtrust_core::error::AppError;
use testtrust_core::traits::clock::SystemClock;
use testtrust_realtime::RealtimeEngine;
use testtrust_worker::CronScheduler;

#[tokio::main]
async fn main() {
    let env = std::env::var("TESTTRUST_ENV").unwrap_or_else(|_| "development".to_string());

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
        tracing::error!("Server error: {}", e);
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
    tracing::info!("Starting TestTrust v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Exam directory ───────────────────────────────────
    let directory = testtrust_directory::build_directory(&config.directory)?;
    tracing::info!(backend = directory.backend_name(), "Exam directory ready");

    // ── Step 2: Real-time engine and session coordinator ─────────
    let realtime = Arc::new(RealtimeEngine::new(
        config.realtime.clone(),
        config.session.clone(),
        Arc::clone(&directory),
        Arc::new(SystemClock),
    ));

    // ── Step 3: Scheduled sweeps ─────────────────────────────────
    let mut scheduler = CronScheduler::new().await?;
    scheduler
        .register_session_tasks(Arc::clone(&realtime.coordinator), &config.session)
        .await?;
    scheduler.start().await?;

    // ── Step 4: HTTP server ──────────────────────────────────────
    let addr = config.server.bind_address();
    let shutdown_grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(Arc::new(config), Arc::clone(&realtime), directory);
    let app = testtrust_api::build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("TestTrust server listening on {}", addr);

    // ── Step 5: Graceful shutdown ────────────────────────────────
    let engine = Arc::clone(&realtime);
    let (signal_tx, signal_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                tracing::info!("Shutdown signal received, starting graceful shutdown...");
                let _ = signal_tx.send(());
                // Open sockets would keep the server from draining.
                engine.shutdown().await;
            })
            .into_future(),
    );

    // Resolves on the signal, or early if the server exits on its own.
    let _ = signal_rx.await;

    match tokio::time::timeout(shutdown_grace, server).await {
        Ok(Ok(result)) => result.map_err(|e| AppError::internal(format!("Server error: {e}")))?,
        Ok(Err(e)) => tracing::error!(error = %e, "Server task failed"),
        Err(_) => tracing::warn!(
            grace_seconds = shutdown_grace.as_secs(),
            "Server did not drain within the shutdown grace period"
        ),
    }

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler shutdown failed");
    }

    tracing::info!("TestTrust server shut down gracefully");
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
