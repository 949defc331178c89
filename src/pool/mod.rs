//! The worker pool.
//!
//! # Data Flow
//! ```text
//! execute(task)
//!     → executor.rs (retry loop, ≤ max_attempts, distinct workers)
//!     → acquire(): registry lock → least_conn::select → begin_task → WorkerLease
//!     → Transport::invoke (no lock held)
//!     → lease dropped → registry lock → finish_task (+ deferred removal)
//!     → record_success / record_failure → circuit breaker
//!
//! reload_config()
//!     → ConfigSource::load (error: nothing changes)
//!     → Registry::apply_reload + settings swap
//!
//! health monitor (health::active) → record_health
//! ```
//!
//! # Design Decisions
//! - One mutex guards all worker state; no critical section awaits
//! - Select-then-increment happens under a single lock acquisition so two
//!   callers cannot both claim a worker's last slot
//! - Settings (retries, circuit, timeouts) are swapped atomically on reload
//! - No globals: any number of pools can coexist

pub mod executor;
pub mod lease;
pub mod stats;

use arc_swap::ArcSwap;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::SystemTime;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{
    CircuitBreakerConfig, ConfigError, ConfigSource, HealthCheckConfig, MemorySource, PoolConfig,
    RetryConfig, TimeoutConfig,
};
use crate::health::active::HealthMonitor;
use crate::lifecycle::Shutdown;
use crate::load_balancer::descriptor::{descriptors_from_raw, WorkerDescriptor};
use crate::load_balancer::least_conn;
use crate::load_balancer::registry::{Registry, ReloadSummary};
use crate::load_balancer::worker::WorkerSnapshot;
use crate::observability::metrics;
use crate::task::{Task, TaskEnvelope, TaskResult};
use crate::transport::Transport;

pub use executor::TaskExecutor;
pub use lease::WorkerLease;
pub use stats::PoolStats;

/// Settings that may change on reload.
#[derive(Debug, Clone, Default)]
pub struct PoolSettings {
    pub circuit_breaker: CircuitBreakerConfig,
    pub retries: RetryConfig,
    pub timeouts: TimeoutConfig,
}

impl From<&PoolConfig> for PoolSettings {
    fn from(config: &PoolConfig) -> Self {
        Self {
            circuit_breaker: config.circuit_breaker.clone(),
            retries: config.retries.clone(),
            timeouts: config.timeouts.clone(),
        }
    }
}

struct MonitorHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

struct PoolInner {
    registry: Mutex<Registry>,
    settings: ArcSwap<PoolSettings>,
    transport: Arc<dyn Transport>,
    source: Arc<dyn ConfigSource>,
    monitor: tokio::sync::Mutex<Option<MonitorHandle>>,
}

/// Handle to a pool of remote workers. Clones share the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

/// Non-owning pool handle for background tasks, so they end with the pool.
#[derive(Clone)]
pub struct WeakWorkerPool {
    inner: Weak<PoolInner>,
}

impl WeakWorkerPool {
    pub fn upgrade(&self) -> Option<WorkerPool> {
        self.inner.upgrade().map(|inner| WorkerPool { inner })
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.registry().len())
            .field("settings", &*self.inner.settings.load())
            .finish()
    }
}

impl WorkerPool {
    /// Build a pool from a configuration source.
    pub fn new(
        source: Arc<dyn ConfigSource>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let config = source.load()?;
        let registry = Registry::from_descriptors(descriptors_from_raw(&config.workers));

        tracing::info!(workers = registry.len(), "Worker pool created");

        Ok(Self {
            inner: Arc::new(PoolInner {
                registry: Mutex::new(registry),
                settings: ArcSwap::from_pointee(PoolSettings::from(&config)),
                transport,
                source,
                monitor: tokio::sync::Mutex::new(None),
            }),
        })
    }

    /// Build a pool from an in-memory configuration.
    pub fn from_config(
        config: PoolConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        Self::new(Arc::new(MemorySource::new(config)), transport)
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // No critical section can leave the registry half-updated.
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn downgrade(&self) -> WeakWorkerPool {
        WeakWorkerPool {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn settings(&self) -> Arc<PoolSettings> {
        self.inner.settings.load_full()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn executor(&self) -> TaskExecutor {
        TaskExecutor::new(self.clone())
    }

    /// Select a worker not in `excluded` and claim one of its slots.
    pub fn acquire(&self, excluded: &HashSet<String>) -> Option<WorkerLease> {
        let now = Instant::now();
        let mut registry = self.registry();
        let worker = least_conn::select(&mut registry, excluded, now)?;
        let trial = worker.begin_task();
        if trial {
            tracing::info!(worker = %worker.id(), "Half-open trial dispatched");
        }
        metrics::set_active_tasks(worker.id(), worker.active_tasks());
        let descriptor = worker.descriptor().clone();
        drop(registry);

        Some(WorkerLease::new(self.clone(), descriptor, trial))
    }

    pub(crate) fn release(&self, id: &str, trial: bool) {
        let mut registry = self.registry();
        if !registry.release(id, trial) {
            if let Some(worker) = registry.get(id) {
                metrics::set_active_tasks(id, worker.active_tasks());
            }
        }
    }

    pub fn record_success(&self, id: &str) {
        if let Some(worker) = self.registry().get_mut(id) {
            worker.record_success();
        }
    }

    pub fn record_failure(&self, id: &str) {
        let settings = self.settings();
        let mut registry = self.registry();
        if let Some(worker) = registry.get_mut(id) {
            if worker.record_failure(Instant::now(), &settings.circuit_breaker) {
                tracing::warn!(
                    worker = %id,
                    failures = worker.failures(),
                    cooldown_secs = settings.circuit_breaker.cooldown_secs,
                    "Worker circuit opened"
                );
            }
        }
    }

    pub(crate) fn record_health(&self, id: &str, healthy: bool) {
        if let Some(worker) = self.registry().get_mut(id) {
            worker.set_health(healthy, SystemTime::now());
        }
        metrics::record_worker_health(id, healthy);
    }

    pub fn worker(&self, id: &str) -> Option<WorkerSnapshot> {
        self.registry().get(id).map(|w| w.snapshot())
    }

    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.registry().all()
    }

    pub(crate) fn descriptors(&self) -> Vec<Arc<WorkerDescriptor>> {
        self.registry()
            .iter()
            .map(|w| w.descriptor().clone())
            .collect()
    }

    pub fn get_pool_stats(&self) -> PoolStats {
        PoolStats::from_registry(&self.registry())
    }

    /// Run a task with retry and failover.
    pub async fn execute(&self, task: Task) -> TaskResult {
        self.executor().execute(task).await
    }

    /// Run a task given in string/map form.
    pub async fn execute_raw(&self, task_type: &str, data: Value) -> TaskResult {
        match Task::from_parts(task_type, data) {
            Ok(task) => self.execute(task).await,
            Err(e) => {
                let envelope_id = uuid::Uuid::new_v4();
                tracing::warn!(task_id = %envelope_id, task_type, error = %e, "Rejected task");
                metrics::record_task("invalid");
                TaskResult::failure(envelope_id, &e, 0)
            }
        }
    }

    pub async fn execute_envelope(&self, envelope: TaskEnvelope) -> TaskResult {
        self.executor().execute_envelope(envelope).await
    }

    /// Re-read configuration and reconcile workers.
    ///
    /// On error nothing in the running pool changes.
    pub fn reload_config(&self) -> Result<ReloadSummary, ConfigError> {
        let config = self.inner.source.load().map_err(|e| {
            tracing::error!(error = %e, "Config reload failed, keeping current workers");
            e
        })?;
        Ok(self.apply_config(&config))
    }

    /// Reconcile against an already loaded configuration.
    pub fn apply_config(&self, config: &PoolConfig) -> ReloadSummary {
        let descriptors = descriptors_from_raw(&config.workers);
        let summary = self.registry().apply_reload(descriptors);
        self.inner.settings.store(Arc::new(PoolSettings::from(config)));

        tracing::info!(
            added = ?summary.added,
            updated = summary.updated.len(),
            removed = ?summary.removed,
            deferred = ?summary.deferred,
            "Configuration reloaded"
        );
        summary
    }

    /// Start the background health monitor. Returns false if it was
    /// disabled, misconfigured or already running.
    ///
    /// The monitor holds only a weak handle and exits once the last
    /// `WorkerPool` clone is dropped.
    pub async fn start_health_monitor(&self, config: HealthCheckConfig) -> bool {
        if !config.enabled {
            tracing::info!("Active health checks disabled");
            return false;
        }
        if config.interval_secs == 0 || config.timeout_secs == 0 {
            tracing::error!(
                interval_secs = config.interval_secs,
                timeout_secs = config.timeout_secs,
                "Health monitor needs a non-zero interval and timeout"
            );
            return false;
        }
        let mut slot = self.inner.monitor.lock().await;
        if slot.is_some() {
            return false;
        }

        let shutdown = Shutdown::new();
        let monitor = HealthMonitor::new(self, config);
        let task = tokio::spawn(monitor.run(shutdown.listener()));
        *slot = Some(MonitorHandle { shutdown, task });
        true
    }

    /// Stop the health monitor and wait for its in-flight probes.
    pub async fn stop_health_monitor(&self) {
        let handle = self.inner.monitor.lock().await.take();
        if let Some(MonitorHandle { shutdown, task }) = handle {
            shutdown.trigger();
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Health monitor task failed");
            }
        }
    }
}
