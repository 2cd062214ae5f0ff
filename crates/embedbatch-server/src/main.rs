use anyhow::{Context, Result};
use embedbatch_monitoring::MonitoringConfig;
use embedbatch_server::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Set up monitoring
    let monitoring_config = MonitoringConfig {
        service_name: "embedbatch-server".to_string(),
        ..MonitoringConfig::from_env()
    };

    // Flushes the log file writer on drop
    let _log_guard = embedbatch_monitoring::init(&monitoring_config)
        .context("Failed to initialize monitoring")?;

    // Load configuration from environment variables
    let config = ServerConfig::load().context("Failed to load configuration")?;

    // Run the server using the library's run function
    embedbatch_server::run(config).await.context("Server error")?;

    embedbatch_monitoring::shutdown();
    Ok(())
}
