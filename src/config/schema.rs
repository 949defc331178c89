//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pool.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the worker pool.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PoolConfig {
    /// Worker definitions. Kept raw so that one malformed entry can be
    /// skipped without rejecting the whole file.
    pub workers: Vec<RawWorkerConfig>,

    /// Circuit breaker thresholds.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Single-backend task queue settings.
    pub queue: QueueConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// A worker entry exactly as written in the config file.
///
/// `id`, `host`, `port` and `enabled` are required; the rest default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawWorkerConfig {
    pub id: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub enabled: Option<bool>,
    pub priority: Option<u32>,
    pub max_concurrent: Option<usize>,
    pub weight: Option<u32>,
    pub capabilities: Option<Vec<String>>,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker open.
    pub failure_threshold: u32,

    /// How long an open breaker blocks traffic, in seconds.
    pub cooldown_secs: u64,
}

impl CircuitBreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_secs: 60,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the background health monitor.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe for HTTP health checks.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            timeout_secs: 5,
            path: "/health".to_string(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per task, each on a different worker.
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds (0 = retry immediately).
    pub base_delay_ms: u64,

    /// Maximum delay between attempts in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 0,
            max_delay_ms: 1000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a single invocation on one worker, in seconds.
    pub invoke_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl TimeoutConfig {
    pub fn invoke(&self) -> Duration {
        Duration::from_secs(self.invoke_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            invoke_secs: 60,
            connect_secs: 5,
        }
    }
}

/// Bounded task queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Number of consumer tasks pulling from the queue.
    pub consumers: usize,

    /// Maximum number of queued submissions.
    pub capacity: usize,

    /// End-to-end deadline for one submission, in seconds.
    pub submit_timeout_secs: u64,

    /// How long a consumer waits for work before re-checking the running flag.
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            consumers: 4,
            capacity: 100,
            submit_timeout_secs: 120,
            poll_interval_ms: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: PoolConfig = toml::from_str("").unwrap();
        assert!(config.workers.is_empty());
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.cooldown(), Duration::from_secs(60));
        assert_eq!(config.health_check.interval_secs, 30);
        assert_eq!(config.retries.max_attempts, 3);
    }

    #[test]
    fn test_partial_sections() {
        let config: PoolConfig = toml::from_str(
            r#"
            [circuit_breaker]
            failure_threshold = 2

            [[workers]]
            id = "w1"
            host = "10.0.0.1"
            port = 8000
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(config.circuit_breaker.failure_threshold, 2);
        assert_eq!(config.circuit_breaker.cooldown_secs, 60);
        assert_eq!(config.workers.len(), 1);
        assert_eq!(config.workers[0].priority, None);
    }
}
