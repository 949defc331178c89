//! Worker descriptors built from configuration.

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::schema::RawWorkerConfig;

pub const DEFAULT_PRIORITY: u32 = 5;
pub const DEFAULT_MAX_CONCURRENT: usize = 10;
pub const DEFAULT_WEIGHT: u32 = 50;

/// Reason a raw worker entry could not become a descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid endpoint for host `{host}`: {reason}")]
    InvalidEndpoint { host: String, reason: String },
}

/// Immutable description of one remote worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerDescriptor {
    pub id: String,
    pub endpoint: Url,
    pub enabled: bool,
    /// Lower value is more preferred.
    pub priority: u32,
    pub max_concurrent: usize,
    pub weight: u32,
    pub capabilities: Vec<String>,
}

impl WorkerDescriptor {
    /// Create an enabled descriptor with default metadata.
    pub fn new(id: impl Into<String>, endpoint: Url) -> Self {
        Self {
            id: id.into(),
            endpoint,
            enabled: true,
            priority: DEFAULT_PRIORITY,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            weight: DEFAULT_WEIGHT,
            capabilities: default_capabilities(),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Build a descriptor from a raw config entry.
    pub fn from_raw(raw: &RawWorkerConfig) -> Result<Self, DescriptorError> {
        let id = raw.id.clone().ok_or(DescriptorError::MissingField("id"))?;
        let host = raw.host.clone().ok_or(DescriptorError::MissingField("host"))?;
        let port = raw.port.ok_or(DescriptorError::MissingField("port"))?;
        let enabled = raw.enabled.ok_or(DescriptorError::MissingField("enabled"))?;

        let endpoint = Url::parse(&format!("http://{}:{}", host, port)).map_err(|e| {
            DescriptorError::InvalidEndpoint {
                host: host.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            id,
            endpoint,
            enabled,
            priority: raw.priority.unwrap_or(DEFAULT_PRIORITY),
            max_concurrent: raw.max_concurrent.unwrap_or(DEFAULT_MAX_CONCURRENT),
            weight: raw.weight.unwrap_or(DEFAULT_WEIGHT),
            capabilities: raw.capabilities.clone().unwrap_or_else(default_capabilities),
        })
    }
}

fn default_capabilities() -> Vec<String> {
    vec!["llm".to_string()]
}

/// Convert every raw entry, skipping (and logging) the malformed ones.
pub fn descriptors_from_raw(raw: &[RawWorkerConfig]) -> Vec<WorkerDescriptor> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, entry)| match WorkerDescriptor::from_raw(entry) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                tracing::warn!(
                    index,
                    id = ?entry.id,
                    error = %e,
                    "Skipping invalid worker entry"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str) -> RawWorkerConfig {
        RawWorkerConfig {
            id: Some(id.to_string()),
            host: Some("10.0.0.7".to_string()),
            port: Some(8000),
            enabled: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let d = WorkerDescriptor::from_raw(&raw("w1")).unwrap();
        assert_eq!(d.endpoint.as_str(), "http://10.0.0.7:8000/");
        assert_eq!(d.priority, 5);
        assert_eq!(d.max_concurrent, 10);
        assert_eq!(d.weight, 50);
        assert_eq!(d.capabilities, vec!["llm".to_string()]);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut entry = raw("w1");
        entry.enabled = None;
        assert_eq!(
            WorkerDescriptor::from_raw(&entry),
            Err(DescriptorError::MissingField("enabled"))
        );

        let mut entry = raw("w1");
        entry.host = None;
        assert_eq!(
            WorkerDescriptor::from_raw(&entry),
            Err(DescriptorError::MissingField("host"))
        );
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let mut broken = raw("w2");
        broken.port = None;
        let descriptors = descriptors_from_raw(&[raw("w1"), broken, raw("w3")]);
        let ids: Vec<_> = descriptors.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "w3"]);
    }
}
