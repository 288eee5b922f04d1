use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tryon_api::background::session_sweeper;
use tryon_api::config::ServerConfig;
use tryon_api::router::build_app_router;
use tryon_api::sessions::run_event_listener;
use tryon_api::state::AppState;
use tryon_client::config::ClientConfig;
use tryon_client::workflow::TryOnWorkflow;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tryon_api=debug,tryon_client=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    let client_config = ClientConfig::from_env().context("Invalid collaborator configuration")?;
    tracing::info!(
        host = %config.host,
        port = %config.port,
        tryon_base_url = %client_config.tryon.base_url,
        poll_interval_ms = client_config.poll.interval.as_millis() as u64,
        poll_max_attempts = client_config.poll.max_attempts,
        session_idle_ttl_secs = config.session_idle_ttl_secs,
        "Loaded server configuration",
    );

    // --- Workflow + state ---
    let workflow = TryOnWorkflow::from_config(&client_config);
    let state = AppState::new(config.clone(), workflow);

    // Route workflow progress back to sessions.
    let listener_handle = tokio::spawn(run_event_listener(
        state.sessions.clone(),
        state.workflow.subscribe(),
        state.cancel.clone(),
    ));

    // Reclaim sessions whose page went away without a DELETE.
    let idle_ttl = config.session_idle_ttl();
    let sweeper_handle = tokio::spawn(session_sweeper::run(
        state.sessions.clone(),
        idle_ttl,
        session_sweeper::sweep_interval(idle_ttl),
        state.cancel.clone(),
    ));

    let cancel = state.cancel.clone();
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cancelling in-flight attempts");
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), listener_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), sweeper_handle).await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
