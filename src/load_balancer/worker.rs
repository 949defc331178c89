//! Per-worker mutable state.
//!
//! # Responsibilities
//! - Track in-flight and lifetime request counts (for least-connections)
//! - Enforce the concurrency cap
//! - Own the worker's circuit breaker
//! - Hold the latest health probe result
//!
//! All of it is mutated only under the pool's registry lock.

use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::load_balancer::descriptor::WorkerDescriptor;
use crate::resilience::{CircuitBreaker, CircuitState};

#[derive(Debug)]
pub struct WorkerState {
    descriptor: Arc<WorkerDescriptor>,
    active_tasks: usize,
    total_requests: u64,
    circuit: CircuitBreaker,
    healthy: bool,
    last_health_check: Option<SystemTime>,
    /// Dropped from config while busy; removed once it drains.
    retiring: bool,
}

impl WorkerState {
    pub fn new(descriptor: WorkerDescriptor) -> Self {
        let circuit = CircuitBreaker::new(descriptor.id.clone());
        Self {
            descriptor: Arc::new(descriptor),
            active_tasks: 0,
            total_requests: 0,
            circuit,
            healthy: true,
            last_health_check: None,
            retiring: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &Arc<WorkerDescriptor> {
        &self.descriptor
    }

    pub fn priority(&self) -> u32 {
        self.descriptor.priority
    }

    pub fn active_tasks(&self) -> usize {
        self.active_tasks
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.circuit.failures()
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    pub fn last_health_check(&self) -> Option<SystemTime> {
        self.last_health_check
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit.state()
    }

    pub fn circuit_open_until(&self) -> Option<Instant> {
        self.circuit.open_until()
    }

    pub fn is_retiring(&self) -> bool {
        self.retiring
    }

    pub fn has_capacity(&self) -> bool {
        self.active_tasks < self.descriptor.max_concurrent
    }

    /// Breaker availability check; may move OPEN to HALF_OPEN.
    pub fn is_available(&mut self, now: Instant) -> bool {
        self.circuit.is_available(now)
    }

    /// Count a new in-flight task. Returns true if it is the half-open trial.
    pub(crate) fn begin_task(&mut self) -> bool {
        self.active_tasks += 1;
        self.total_requests += 1;
        self.circuit.begin_trial()
    }

    pub(crate) fn finish_task(&mut self, trial: bool) {
        if trial {
            self.circuit.end_trial();
        }
        if self.active_tasks == 0 {
            tracing::error!(worker = %self.id(), "Task finished on idle worker");
            return;
        }
        self.active_tasks -= 1;
    }

    pub(crate) fn record_success(&mut self) {
        self.circuit.record_success();
    }

    pub(crate) fn record_failure(&mut self, now: Instant, config: &CircuitBreakerConfig) -> bool {
        self.circuit.record_failure(now, config)
    }

    pub(crate) fn set_health(&mut self, healthy: bool, checked_at: SystemTime) {
        if self.healthy != healthy {
            tracing::info!(worker = %self.id(), healthy, "Worker health changed");
        }
        self.healthy = healthy;
        self.last_health_check = Some(checked_at);
    }

    /// Swap in new metadata from a reload; live counters are kept.
    pub(crate) fn update_descriptor(&mut self, descriptor: WorkerDescriptor) {
        self.descriptor = Arc::new(descriptor);
        self.retiring = false;
    }

    pub(crate) fn mark_retiring(&mut self) {
        self.retiring = true;
    }

    #[cfg(test)]
    pub(crate) fn set_counters(&mut self, active_tasks: usize, total_requests: u64) {
        self.active_tasks = active_tasks;
        self.total_requests = total_requests;
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.descriptor.id.clone(),
            endpoint: self.descriptor.endpoint.to_string(),
            priority: self.descriptor.priority,
            max_concurrent: self.descriptor.max_concurrent,
            weight: self.descriptor.weight,
            capabilities: self.descriptor.capabilities.clone(),
            active_tasks: self.active_tasks,
            total_requests: self.total_requests,
            failures: self.circuit.failures(),
            healthy: self.healthy,
            last_health_check: self
                .last_health_check
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs()),
            circuit_state: self.circuit.state(),
            retiring: self.retiring,
        }
    }
}

/// Point-in-time copy of a worker's state, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerSnapshot {
    pub id: String,
    pub endpoint: String,
    pub priority: u32,
    pub max_concurrent: usize,
    pub weight: u32,
    pub capabilities: Vec<String>,
    pub active_tasks: usize,
    pub total_requests: u64,
    pub failures: u32,
    pub healthy: bool,
    /// Seconds since the Unix epoch.
    pub last_health_check: Option<u64>,
    pub circuit_state: CircuitState,
    pub retiring: bool,
}
