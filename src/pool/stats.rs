//! Pool-wide statistics.

use serde::Serialize;

use crate::load_balancer::registry::Registry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStats {
    pub total_workers: usize,
    pub healthy_workers: usize,
    pub total_tasks_processed: u64,
    pub active_tasks: usize,
    /// `1 - failures / requests`, three decimals; 0.0 before any request.
    pub success_rate: f64,
}

impl PoolStats {
    pub fn from_registry(registry: &Registry) -> Self {
        let mut stats = PoolStats {
            total_workers: registry.len(),
            healthy_workers: 0,
            total_tasks_processed: 0,
            active_tasks: 0,
            success_rate: 0.0,
        };
        let mut failures: u64 = 0;

        for worker in registry.iter() {
            if worker.is_healthy() {
                stats.healthy_workers += 1;
            }
            stats.total_tasks_processed += worker.total_requests();
            stats.active_tasks += worker.active_tasks();
            failures += u64::from(worker.failures());
        }

        if stats.total_tasks_processed > 0 {
            let rate = 1.0 - failures as f64 / stats.total_tasks_processed as f64;
            stats.success_rate = (rate * 1000.0).round() / 1000.0;
        }
        stats
    }
}
