//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each worker concurrently (Transport::probe, with timeout)
//!     → WorkerState.healthy / last_health_check
//!     → PoolStats.healthy_workers
//! ```
//!
//! # Design Decisions
//! - One bad worker cannot stall or abort a round: errors, timeouts and
//!   panics are caught per probe
//! - Stopping the monitor waits for the current round to finish
//! - The monitor holds a weak pool handle and exits once the pool is dropped
//! - Health does not gate selection; breakers do

pub mod active;
