//! Configuration for the Embedbatch server
//!
//! Every section is read from environment variables on top of its defaults.

use embedbatch_core::config::{env_optional, env_parse, env_string};
use embedbatch_core::EmbeddingConfig;
use embedbatch_jobs::JobsConfig;
use embedbatch_store::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Deployment environment (development, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Accepted bearer tokens
    #[serde(default = "default_api_keys")]
    pub api_keys: Vec<String>,

    /// Shared secret sent by the RapidAPI proxy, disabled when unset
    #[serde(default)]
    pub rapidapi_proxy_secret: Option<String>,

    /// Maximum number of inputs in one synchronous request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Largest upload accepted by `/v1/embed/file`
    #[serde(default = "default_sync_file_limit_mb")]
    pub sync_file_limit_mb: u64,

    #[serde(default = "default_rate_limit_per_second")]
    pub rate_limit_per_second: u32,

    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_api_keys() -> Vec<String> {
    vec!["test-api-key".to_string()]
}

fn default_max_batch_size() -> usize {
    100
}

fn default_sync_file_limit_mb() -> u64 {
    5
}

fn default_rate_limit_per_second() -> u32 {
    10
}

fn default_rate_limit_burst() -> u32 {
    20
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            environment: default_environment(),
            api_keys: default_api_keys(),
            rapidapi_proxy_secret: None,
            max_batch_size: default_max_batch_size(),
            sync_file_limit_mb: default_sync_file_limit_mb(),
            rate_limit_per_second: default_rate_limit_per_second(),
            rate_limit_burst: default_rate_limit_burst(),
            embedding: EmbeddingConfig::default(),
            jobs: JobsConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Splits a comma separated key list, dropping blanks.
pub fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        let defaults = Self::default();

        let config = Self {
            port: env_parse("PORT", defaults.port),
            bind_address: env_string("HOST", &defaults.bind_address),
            environment: env_string("ENV", &defaults.environment),
            api_keys: env_optional("API_KEYS")
                .map(|raw| parse_api_keys(&raw))
                .unwrap_or(defaults.api_keys),
            rapidapi_proxy_secret: env_optional("RAPIDAPI_PROXY_SECRET"),
            max_batch_size: env_parse("MAX_BATCH_SIZE", defaults.max_batch_size),
            sync_file_limit_mb: env_parse("SYNC_FILE_LIMIT_MB", defaults.sync_file_limit_mb),
            rate_limit_per_second: env_parse("RATE_LIMIT_PER_SECOND", defaults.rate_limit_per_second),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            embedding: EmbeddingConfig::from_env(),
            jobs: JobsConfig::from_env(),
            store: StoreConfig::from_env(),
        };

        config.validate()?;

        if config.api_keys.is_empty() && config.rapidapi_proxy_secret.is_none() {
            warn!("No API_KEYS or RAPIDAPI_PROXY_SECRET configured - every /v1 request will be rejected");
        }
        if config.is_production() && config.api_keys.iter().any(|key| key == "test-api-key") {
            warn!("The default test API key is enabled in production");
        }

        info!(
            port = config.port,
            environment = %config.environment,
            provider = ?config.embedding.provider,
            workers = config.jobs.worker_count,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Rejects limits that would make the service unusable.
    pub fn validate(&self) -> ServerResult<()> {
        if self.max_batch_size == 0 {
            return Err(ServerError::ConfigurationError(
                "MAX_BATCH_SIZE must be at least 1".to_string(),
            ));
        }
        if self.rate_limit_per_second == 0 || self.rate_limit_burst == 0 {
            return Err(ServerError::ConfigurationError(
                "RATE_LIMIT_PER_SECOND and RATE_LIMIT_BURST must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Upload limit of the synchronous file endpoint in bytes.
    pub fn sync_file_limit_bytes(&self) -> usize {
        (self.sync_file_limit_mb as usize).saturating_mul(1024 * 1024)
    }
}
