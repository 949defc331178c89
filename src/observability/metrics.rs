//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pool_tasks_total` (counter): finished tasks by outcome
//! - `pool_attempts_total` (counter): invocation attempts by worker, outcome
//! - `pool_active_tasks` (gauge): in-flight tasks per worker
//! - `pool_worker_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `pool_circuit_transitions_total` (counter): breaker transitions by worker, from, to
//! - `queue_submissions_total` (counter): queue submissions by outcome

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_task(outcome: &'static str) {
    metrics::counter!("pool_tasks_total", "outcome" => outcome).increment(1);
}

pub fn record_attempt(worker: &str, outcome: &'static str) {
    metrics::counter!(
        "pool_attempts_total",
        "worker" => worker.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn set_active_tasks(worker: &str, active: usize) {
    metrics::gauge!("pool_active_tasks", "worker" => worker.to_string()).set(active as f64);
}

pub fn record_worker_health(worker: &str, healthy: bool) {
    metrics::gauge!("pool_worker_healthy", "worker" => worker.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_circuit_transition(worker: &str, from: &'static str, to: &'static str) {
    metrics::counter!(
        "pool_circuit_transitions_total",
        "worker" => worker.to_string(),
        "from" => from,
        "to" => to
    )
    .increment(1);
}

pub fn record_queue_submission(outcome: &'static str) {
    metrics::counter!("queue_submissions_total", "outcome" => outcome).increment(1);
}
