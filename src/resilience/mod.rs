//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt on a worker:
//!     → timeouts.rs (every invocation has a deadline)
//!     → circuit_breaker.rs (outcome recorded against the worker)
//!     → On failure: backoff.rs (optional delay before the next worker)
//! ```
//!
//! # Design Decisions
//! - Per-worker circuit breaker (not global)
//! - Open breakers fail fast: the worker is skipped by selection
//! - Backoff is off by default because each retry goes to a different worker

pub mod backoff;
pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
