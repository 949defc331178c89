//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::config::schema::PoolConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<PoolConfig, ConfigError> {
    let config: PoolConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PoolConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Somewhere the pool can (re-)read its configuration from.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<PoolConfig, ConfigError>;
}

/// A TOML file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<PoolConfig, ConfigError> {
        load_config(&self.path)
    }
}

/// A configuration held in memory, for embedders that build it themselves.
#[derive(Debug, Default)]
pub struct MemorySource {
    config: Mutex<PoolConfig>,
}

impl MemorySource {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    /// Replace the configuration seen by the next reload.
    pub fn set(&self, config: PoolConfig) {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = config;
    }
}

impl ConfigSource for MemorySource {
    fn load(&self) -> Result<PoolConfig, ConfigError> {
        let config = self
            .config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
