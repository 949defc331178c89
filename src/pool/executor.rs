//! Retry / failover orchestration for one task.
//!
//! # Flow
//! ```text
//! loop (≤ max_attempts):
//!     acquire(excluded)            select + increment, one critical section
//!         none → stop
//!     invoke with deadline         outside the lock
//!     drop lease                   active_tasks released before inspecting outcome
//!     Ok  → breaker success, return
//!     Err → breaker failure, exclude worker, remember error, next attempt
//! → failure result with last error and fallback = true
//! ```

use futures_util::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;

use crate::observability::metrics;
use crate::pool::WorkerPool;
use crate::resilience::backoff;
use crate::resilience::timeouts::with_deadline;
use crate::task::{Task, TaskEnvelope, TaskError, TaskResult};
use crate::transport::InvokeError;

/// Runs tasks against a pool. Cheap to construct; holds only a pool handle.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    pool: WorkerPool,
}

impl TaskExecutor {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    pub async fn execute(&self, task: Task) -> TaskResult {
        self.execute_envelope(TaskEnvelope::new(task)).await
    }

    pub async fn execute_envelope(&self, envelope: TaskEnvelope) -> TaskResult {
        let settings = self.pool.settings();
        let max_attempts = settings.retries.max_attempts.max(1);
        let deadline = settings.timeouts.invoke();
        let task_type = envelope.task.kind();

        let mut excluded: HashSet<String> = HashSet::new();
        let mut last_error: Option<TaskError> = None;
        let mut attempts: u32 = 0;

        while attempts < max_attempts {
            let delay = backoff::delay_before(attempts + 1, &settings.retries);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let Some(lease) = self.pool.acquire(&excluded) else {
                tracing::warn!(
                    task_id = %envelope.id,
                    task_type,
                    attempts,
                    excluded = excluded.len(),
                    "No eligible worker"
                );
                break;
            };
            attempts += 1;
            let worker_id = lease.id().to_string();

            tracing::debug!(
                task_id = %envelope.id,
                task_type,
                worker = %worker_id,
                attempt = attempts,
                "Dispatching task"
            );

            let call = self.pool.transport().invoke(&lease, &envelope.task);
            let outcome = with_deadline(deadline, async {
                AssertUnwindSafe(call)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(InvokeError::Remote("transport panicked".into())))
            })
            .await;
            drop(lease);

            match outcome {
                Ok(output) => {
                    self.pool.record_success(&worker_id);
                    metrics::record_attempt(&worker_id, "success");
                    metrics::record_task("success");
                    tracing::info!(
                        task_id = %envelope.id,
                        task_type,
                        worker = %worker_id,
                        attempt = attempts,
                        "Task completed"
                    );
                    return TaskResult::success(envelope.id, worker_id, attempts, output);
                }
                Err(e) => {
                    tracing::warn!(
                        task_id = %envelope.id,
                        task_type,
                        worker = %worker_id,
                        attempt = attempts,
                        error = %e,
                        "Task attempt failed"
                    );
                    metrics::record_attempt(&worker_id, "failure");
                    self.pool.record_failure(&worker_id);
                    excluded.insert(worker_id.clone());
                    last_error = Some(TaskError::Invocation {
                        worker_id,
                        source: e,
                    });
                }
            }
        }

        let error = last_error.unwrap_or(TaskError::NoWorkersAvailable);
        metrics::record_task("fallback");
        tracing::warn!(
            task_id = %envelope.id,
            task_type,
            attempts,
            error = %error,
            "Task failed, caller should fall back"
        );
        TaskResult::failure(envelope.id, &error, attempts)
    }
}
