use embedbatch_core::config::env_parse;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Worker pool and outbound HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_callback_timeout")]
    pub callback_timeout_secs: u64,
}

fn default_worker_count() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    100
}

fn default_download_timeout() -> u64 {
    60
}

fn default_callback_timeout() -> u64 {
    10
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            download_timeout_secs: default_download_timeout(),
            callback_timeout_secs: default_callback_timeout(),
        }
    }
}

impl JobsConfig {
    /// Reads `WORKER_COUNT`, `JOB_QUEUE_CAPACITY`, `DOWNLOAD_TIMEOUT_SECS` and `CALLBACK_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut config = Self {
            worker_count: env_parse("WORKER_COUNT", defaults.worker_count),
            queue_capacity: env_parse("JOB_QUEUE_CAPACITY", defaults.queue_capacity),
            download_timeout_secs: env_parse("DOWNLOAD_TIMEOUT_SECS", defaults.download_timeout_secs),
            callback_timeout_secs: env_parse("CALLBACK_TIMEOUT_SECS", defaults.callback_timeout_secs),
        };

        if config.worker_count == 0 {
            warn!("WORKER_COUNT must be at least 1, using {}", defaults.worker_count);
            config.worker_count = defaults.worker_count;
        }
        if config.queue_capacity == 0 {
            warn!("JOB_QUEUE_CAPACITY must be at least 1, using {}", defaults.queue_capacity);
            config.queue_capacity = defaults.queue_capacity;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = JobsConfig::default();
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.download_timeout_secs, 60);
        assert_eq!(config.callback_timeout_secs, 10);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: JobsConfig = serde_json::from_str(r#"{"worker_count": 2}"#).unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.queue_capacity, 100);
    }
}
