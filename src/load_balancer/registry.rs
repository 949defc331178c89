//! Worker registry.
//!
//! # Responsibilities
//! - Own one `WorkerState` per configured, enabled worker
//! - Reconcile membership on reload without resetting live counters
//! - Defer removal of busy workers until they drain
//!
//! The registry is a plain map; the pool wraps it in its single lock.

use std::collections::{BTreeMap, HashSet};

use crate::load_balancer::descriptor::WorkerDescriptor;
use crate::load_balancer::worker::{WorkerSnapshot, WorkerState};

/// What a reload changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReloadSummary {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    /// Absent from the new config but still busy.
    pub deferred: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Registry {
    /// Ordered by id so iteration (and tie-breaking) is deterministic.
    workers: BTreeMap<String, WorkerState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_descriptors(descriptors: Vec<WorkerDescriptor>) -> Self {
        let mut registry = Self::new();
        registry.apply_reload(descriptors);
        registry
    }

    /// Add a worker, or refresh its metadata if the id is already present.
    pub fn add(&mut self, descriptor: WorkerDescriptor) {
        match self.workers.get_mut(&descriptor.id) {
            Some(existing) => existing.update_descriptor(descriptor),
            None => {
                self.workers
                    .insert(descriptor.id.clone(), WorkerState::new(descriptor));
            }
        }
    }

    /// Remove an idle worker. Returns false if it is unknown or still busy.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.workers.get(id) {
            Some(worker) if worker.active_tasks() == 0 => {
                self.workers.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&WorkerState> {
        self.workers.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut WorkerState> {
        self.workers.get_mut(id)
    }

    pub(crate) fn workers_mut(&mut self) -> impl Iterator<Item = &mut WorkerState> {
        self.workers.values_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkerState> {
        self.workers.values()
    }

    pub fn all(&self) -> Vec<WorkerSnapshot> {
        self.workers.values().map(WorkerState::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Release one in-flight task on `id`, completing a deferred removal
    /// if that was the last one. Returns true if the worker was removed.
    ///
    /// `trial` frees the worker's half-open trial slot.
    pub(crate) fn release(&mut self, id: &str, trial: bool) -> bool {
        let Some(worker) = self.workers.get_mut(id) else {
            tracing::warn!(worker = %id, "Released task on unknown worker");
            return false;
        };
        worker.finish_task(trial);
        if worker.is_retiring() && worker.active_tasks() == 0 {
            self.workers.remove(id);
            tracing::info!(worker = %id, "Drained worker removed");
            return true;
        }
        false
    }

    /// Reconcile the registry against a new descriptor set.
    ///
    /// Disabled descriptors count as absent.
    pub fn apply_reload(&mut self, descriptors: Vec<WorkerDescriptor>) -> ReloadSummary {
        let mut summary = ReloadSummary::default();
        let incoming: Vec<WorkerDescriptor> =
            descriptors.into_iter().filter(|d| d.enabled).collect();
        let keep: HashSet<&str> = incoming.iter().map(|d| d.id.as_str()).collect();

        let stale: Vec<String> = self
            .workers
            .keys()
            .filter(|id| !keep.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            if self.remove(&id) {
                summary.removed.push(id);
            } else if let Some(worker) = self.workers.get_mut(&id) {
                worker.mark_retiring();
                summary.deferred.push(id);
            }
        }

        for descriptor in incoming {
            if self.workers.contains_key(&descriptor.id) {
                summary.updated.push(descriptor.id.clone());
            } else {
                summary.added.push(descriptor.id.clone());
            }
            self.add(descriptor);
        }

        summary
    }
}
