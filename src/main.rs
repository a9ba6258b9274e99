//! Sensor Relay - Entry Point
//!
//! Starts the WebSocket server and the state renderer, then stops both on
//! Ctrl+C or SIGTERM.

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sensor_relay::config::{Config, LogConfig};
use sensor_relay::services::{StateRenderer, StateRendererHandle};
use sensor_relay::{RelayServer, SharedState, StopOutcome};

#[tokio::main]
async fn main() -> sensor_relay::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    init_tracing(&config.log);

    info!("Starting Sensor Relay");

    let store = SharedState::new(config.session.message_log_capacity);

    // Start renderer
    let (renderer_handle, renderer_shutdown) = StateRendererHandle::new();
    let renderer = StateRenderer::new(store.clone(), config.session.mode);
    let renderer_task = tokio::spawn(async move {
        renderer.run(renderer_shutdown).await;
    });

    // Start server
    let server = RelayServer::new(config.server.clone(), config.session.mode, store)
        .start()
        .await?;

    info!(
        "Server started - ws://{}{} ({} mode)",
        server.local_addr(),
        config.server.path,
        config.session.mode.as_str()
    );

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    let outcome = server
        .stop(config.shutdown.grace_period, config.shutdown.force_timeout)
        .await;
    if outcome == StopOutcome::Forced {
        warn!("Some sessions were terminated at the shutdown deadline");
    }

    renderer_handle.shutdown();
    let _ = renderer_task.await;

    info!("Sensor Relay stopped");
    Ok(())
}

/// Initialize tracing from the log configuration
fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("sensor_relay={},tower_http=debug", log.level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
