//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered worker, all probes concurrently
//! - Record the latest result on the worker (`healthy`, `last_health_check`)
//!
//! Health is a diagnostic signal only; routing decisions come from the
//! circuit breakers, which are driven by task outcomes.

use futures_util::future::join_all;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::lifecycle::ShutdownListener;
use crate::pool::{WeakWorkerPool, WorkerPool};
use crate::resilience::timeouts::with_deadline;
use crate::transport::InvokeError;

pub struct HealthMonitor {
    pool: WeakWorkerPool,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(pool: &WorkerPool, config: HealthCheckConfig) -> Self {
        Self {
            pool: pool.downgrade(),
            config,
        }
    }

    /// Probe on every tick until `shutdown` fires or the pool is dropped.
    ///
    /// A round that has started always finishes before the loop exits.
    pub async fn run(self, mut shutdown: ShutdownListener) {
        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs.max(1));
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(pool) = self.pool.upgrade() else {
                        tracing::info!("Worker pool dropped, health monitor exiting");
                        break;
                    };
                    self.probe_round(&pool).await;
                }
                _ = shutdown.wait() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one probe round. Returns the number of healthy workers, or 0 if
    /// the pool is gone.
    pub async fn check_all(&self) -> usize {
        match self.pool.upgrade() {
            Some(pool) => self.probe_round(&pool).await,
            None => 0,
        }
    }

    async fn probe_round(&self, pool: &WorkerPool) -> usize {
        let workers = pool.descriptors();
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let transport = pool.transport();

        let probes = workers.iter().map(|worker| async move {
            let probe = AssertUnwindSafe(transport.probe(worker))
                .catch_unwind()
                .map(|r| r.unwrap_or_else(|_| Err(InvokeError::Remote("probe panicked".into()))));
            (worker, with_deadline(timeout, probe).await)
        });

        let mut healthy_count = 0;
        for (worker, result) in join_all(probes).await {
            let healthy = match result {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        worker = %worker.id,
                        endpoint = %worker.endpoint,
                        error = %e,
                        "Health check failed"
                    );
                    false
                }
            };
            if healthy {
                healthy_count += 1;
            }
            pool.record_health(&worker.id, healthy);
        }

        tracing::debug!(
            workers = workers.len(),
            healthy = healthy_count,
            "Health check round complete"
        );
        healthy_count
    }
}
