//! Main entry point for the health server binary

use anyhow::Result;
use health_core::{create_app, run_server, AppConfig, HealthEndpoint, Monitor, TracingListener};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());

    let addr: SocketAddr = config.bind_address().parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    let endpoint = HealthEndpoint::new();
    let monitor = Monitor::builder()
        .subsystems(config.subsystem_specs())
        .default_probe_interval(config.monitor.default_probe_interval())
        .listener(TracingListener)
        .listener(endpoint.clone())
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build health monitor: {}", e))?;

    info!("Monitoring {} subsystem(s)", monitor.len());
    for name in monitor.names() {
        info!("Subsystem: {}", name);
    }

    monitor.start()?;

    let app = create_app(endpoint);
    let served = run_server(app, addr).await;

    monitor.shutdown()?;
    served?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let default_level = if cfg!(debug_assertions) {
                "debug"
            } else {
                "info"
            };

            format!(
                "{}={},health_core={},tower_http=debug",
                env!("CARGO_CRATE_NAME").replace('-', "_"),
                default_level,
                default_level
            ).into()
        });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .init();
    }
}
