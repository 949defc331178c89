//! Inference worker pool.
//!
//! Routes tasks to a dynamic set of remote inference workers: priority-first,
//! least-connections selection, per-worker circuit breakers, bounded retry
//! with failover to a different worker on each attempt, a background health
//! monitor and hot configuration reload.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod pool;
pub mod queue;
pub mod resilience;
pub mod task;
pub mod transport;

pub use config::PoolConfig;
pub use pool::{PoolStats, WorkerPool};
pub use queue::TaskQueue;
pub use task::{Task, TaskResult};
pub use transport::{HttpTransport, Transport};
