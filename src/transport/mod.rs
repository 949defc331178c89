//! Transport to remote workers.
//!
//! # Data Flow
//! ```text
//! executor / queue / health monitor
//!     → Transport::invoke(worker, task)   (one attempt, may fail)
//!     → Transport::probe(worker)          (liveness only)
//! ```
//!
//! # Design Decisions
//! - Outcomes are values: `Result<TaskOutput, InvokeError>`, never panics
//! - An explicit `"error"` in a worker reply counts as a failure
//! - The pool is generic over the transport so tests can script outcomes

pub mod http;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::load_balancer::descriptor::WorkerDescriptor;
use crate::task::{Task, TaskOutput};

pub use http::HttpTransport;

/// Failure of a single call to a single worker.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvokeError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("worker returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("worker reported error: {0}")]
    Remote(String),

    #[error("undecodable response: {0}")]
    Decode(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Performs the actual remote calls.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Run one task on one worker.
    async fn invoke(&self, worker: &WorkerDescriptor, task: &Task)
        -> Result<TaskOutput, InvokeError>;

    /// Liveness check. `Ok` means the worker answered.
    async fn probe(&self, worker: &WorkerDescriptor) -> Result<(), InvokeError>;
}
