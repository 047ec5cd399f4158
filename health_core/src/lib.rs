//! Core library: subsystem health monitoring and its HTTP rendering.

pub mod clock;
pub mod config;
pub mod error;
pub mod handler;
pub mod listener;
pub mod metadata;
pub mod monitor;
pub mod probe;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, SubsystemConfig};
pub use error::{
    error_status, status_of_result, with_status, MonitorError, Result, SelfHealthy, SelfStatus,
    StatusError, SubsystemError,
};
pub use handler::{default_response_coder, health_routes, HealthEndpoint, ResponseCoder};
pub use listener::{MonitorEvent, MonitorListener, MonitorListeners, TracingListener};
pub use metadata::Metadata;
pub use monitor::{
    Monitor, MonitorBuilder, MonitorOptions, MonitorState, Subsystem, SubsystemSpec, Updater,
};
pub use probe::{FilesystemProbe, Probe, ProbeResult, SharedProbe, DEFAULT_PROBE_INTERVAL};
pub use status::StatusLevel;

use axum::Router;
use std::net::SocketAddr;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The health routes with request tracing.
pub fn create_app(endpoint: HealthEndpoint) -> Router {
    health_routes(endpoint).layer(TraceLayer::new_for_http())
}

pub async fn run_server(app: Router, addr: SocketAddr) -> std::io::Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
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
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
