//! RAII lease on a worker's in-flight slot.

use std::ops::Deref;
use std::sync::Arc;

use crate::load_balancer::descriptor::WorkerDescriptor;
use crate::pool::WorkerPool;

/// Holds one `active_tasks` slot on a worker.
///
/// Dropping the lease releases the slot on every exit path (success,
/// error, panic or cancellation of the surrounding future).
#[derive(Debug)]
pub struct WorkerLease {
    pool: WorkerPool,
    descriptor: Arc<WorkerDescriptor>,
    trial: bool,
}

impl WorkerLease {
    pub(crate) fn new(pool: WorkerPool, descriptor: Arc<WorkerDescriptor>, trial: bool) -> Self {
        Self {
            pool,
            descriptor,
            trial,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Whether this lease holds the worker's half-open trial slot.
    pub fn is_trial(&self) -> bool {
        self.trial
    }
}

impl Deref for WorkerLease {
    type Target = WorkerDescriptor;
    fn deref(&self) -> &Self::Target {
        &self.descriptor
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        self.pool.release(&self.descriptor.id, self.trial);
    }
}
