//! Worker registry and load balancing.
//!
//! # Data Flow
//! ```text
//! PoolConfig.workers
//!     → descriptor.rs (raw entries → WorkerDescriptor, bad ones skipped)
//!     → registry.rs (one WorkerState per enabled worker)
//!     → least_conn.rs (priority group, then fewest in-flight tasks, then id)
//!     → worker.rs (counters + circuit breaker updated under the pool lock)
//! ```
//!
//! # Design Decisions
//! - Selection is deterministic: equal candidates resolve by ascending id
//! - Saturated, retiring and OPEN workers are never chosen
//! - Reload updates metadata in place; counters survive

pub mod descriptor;
pub mod least_conn;
pub mod registry;
pub mod worker;

pub use descriptor::WorkerDescriptor;
pub use registry::{Registry, ReloadSummary};
pub use worker::{WorkerSnapshot, WorkerState};
