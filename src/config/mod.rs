//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PoolConfig
//!     → load_balancer::descriptor (raw workers → WorkerDescriptor, bad entries skipped)
//!
//! On reload:
//!     watcher.rs detects change (or SIGHUP)
//!     → WorkerPool::reload_config() re-reads through ConfigSource
//!     → registry reconciles workers, settings swapped atomically
//! ```
//!
//! # Design Decisions
//! - A failed reload leaves the running pool untouched
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{
    load_config, parse_config, ConfigError, ConfigSource, FileSource, MemorySource,
};
pub use schema::{
    CircuitBreakerConfig, HealthCheckConfig, ObservabilityConfig, PoolConfig, QueueConfig,
    RawWorkerConfig, RetryConfig, TimeoutConfig,
};
