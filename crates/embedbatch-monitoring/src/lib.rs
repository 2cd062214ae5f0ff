//! Monitoring for the Embedbatch services: structured logging and job metrics.

use std::env;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

pub mod logging;
pub mod metrics;

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,embedbatch_jobs=debug")
    pub log_filter: String,
    /// JSON output on stdout instead of the pretty format
    pub enable_json_logging: bool,
    /// Optional file that receives daily-rotated JSON logs
    pub log_file: Option<String>,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "embedbatch".to_string(),
            log_filter: "info".to_string(),
            enable_json_logging: false,
            log_file: None,
            environment: "development".to_string(),
        }
    }
}

impl MonitoringConfig {
    /// Reads `LOG_LEVEL`, `LOG_JSON`, `LOG_FILE` and `ENV`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |key: &str| env::var(key).ok().filter(|value| !value.is_empty());

        Self {
            service_name: defaults.service_name,
            log_filter: read("LOG_LEVEL").unwrap_or(defaults.log_filter),
            enable_json_logging: read("LOG_JSON")
                .map(|value| matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(defaults.enable_json_logging),
            log_file: read("LOG_FILE"),
            environment: read("ENV").unwrap_or(defaults.environment),
        }
    }
}

/// Initialize monitoring system.
///
/// Keep the returned guard alive for as long as file logging should be flushed.
pub fn init(config: &MonitoringConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let guard = logging::init_logging(config)?;
    info!(environment = %config.environment, "Monitoring initialized");
    Ok(guard)
}

/// Shutdown the monitoring system
pub fn shutdown() {
    info!("Shutting down monitoring system");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "embedbatch");
        assert_eq!(config.log_filter, "info");
        assert!(!config.enable_json_logging);
        assert!(config.log_file.is_none());
    }
}

// Exported types
pub use crate::metrics::*;
