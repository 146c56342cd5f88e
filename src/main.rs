use anyhow::Result;
use logboard_core::config::{Config, TelemetryConfig};
use logboard_core::{server, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    let telemetry_config = TelemetryConfig::from_env();
    telemetry::init_tracing(&telemetry_config);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let prometheus_handle = telemetry::init_metrics(&config.telemetry)?;

    info!("Starting Logboard Core");
    info!(
        production = config.is_production(),
        "HTTP server listening on {}",
        config.http_addr()
    );

    server::run(config, prometheus_handle).await
}
