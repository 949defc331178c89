//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and worker id
//! uniqueness. Every problem is reported, not just the first.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::PoolConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duplicate worker id `{0}`")]
    DuplicateWorker(String),

    #[error("worker `{0}` has max_concurrent = 0")]
    ZeroConcurrency(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &PoolConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for worker in &config.workers {
        let Some(id) = worker.id.as_deref() else {
            continue;
        };
        if !seen.insert(id) {
            errors.push(ValidationError::DuplicateWorker(id.to_string()));
        }
        if worker.max_concurrent == Some(0) {
            errors.push(ValidationError::ZeroConcurrency(id.to_string()));
        }
    }

    let checks: [(&'static str, u64); 9] = [
        ("retries.max_attempts", config.retries.max_attempts.into()),
        (
            "circuit_breaker.failure_threshold",
            config.circuit_breaker.failure_threshold.into(),
        ),
        ("health_check.interval_secs", config.health_check.interval_secs),
        ("health_check.timeout_secs", config.health_check.timeout_secs),
        ("timeouts.invoke_secs", config.timeouts.invoke_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("queue.capacity", config.queue.capacity as u64),
        ("queue.consumers", config.queue.consumers as u64),
        ("queue.submit_timeout_secs", config.queue.submit_timeout_secs),
    ];
    for (field, value) in checks {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RawWorkerConfig;

    fn worker(id: &str) -> RawWorkerConfig {
        RawWorkerConfig {
            id: Some(id.into()),
            host: Some("localhost".into()),
            port: Some(9000),
            enabled: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&PoolConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = PoolConfig::default();
        config.workers = vec![worker("a"), worker("a")];
        config.workers[1].max_concurrent = Some(0);
        config.retries.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::DuplicateWorker("a".into()),
                ValidationError::ZeroConcurrency("a".into()),
                ValidationError::Zero("retries.max_attempts"),
            ]
        );
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = PoolConfig::default();
        config.timeouts.invoke_secs = 0;
        config.timeouts.connect_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::Zero("timeouts.invoke_secs"),
                ValidationError::Zero("timeouts.connect_secs"),
            ]
        );
    }
}
