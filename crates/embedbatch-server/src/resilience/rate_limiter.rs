//!
//! Per-client token bucket rate limiter
//!

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Rate limiter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Tokens added back per second
    pub per_second: u32,

    /// Bucket capacity
    pub burst: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            per_second: 10,
            burst: 20,
        }
    }
}

impl From<&ServerConfig> for RateLimiterConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            per_second: config.rate_limit_per_second,
            burst: config.rate_limit_burst,
        }
    }
}

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

/// Keeps one bucket per client identifier.
pub struct RateLimiter {
    config: RateLimiterConfig,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimiterConfig {
        self.config
    }

    /// Takes one token from the client's bucket.
    ///
    /// Returns the whole tokens left, or `RateLimitExceeded` when the bucket is empty.
    pub fn allow(&self, client: &str) -> ServerResult<u32> {
        self.allow_at(client, Instant::now())
    }

    pub(crate) fn allow_at(&self, client: &str, now: Instant) -> ServerResult<u32> {
        let capacity = f64::from(self.config.burst);
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        let bucket = buckets.entry(client.to_string()).or_insert_with(|| TokenBucket {
            tokens: capacity,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * f64::from(self.config.per_second)).min(capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(bucket.tokens.floor() as u32)
        } else {
            Err(ServerError::RateLimitExceeded {
                identifier: client.to_string(),
                per_second: self.config.per_second,
                burst: self.config.burst,
            })
        }
    }

    /// Number of clients with a bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
