//! Mesh health monitor binary

use health_monitor::{Config, HealthMonitorServer, setup_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Tracing is not up yet, so configuration errors go to stderr
    let config = Config::load().inspect_err(|e| eprintln!("Configuration error: {}", e))?;
    let monitor_config = config.to_monitor_config()?;

    // Flushes pending spans on drop
    let _telemetry_guard = setup_tracing(&config.logging, &config.telemetry).await?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Mesh health monitor starting");

    let server = HealthMonitorServer::new(monitor_config)?;
    server.run().await?;

    Ok(())
}
