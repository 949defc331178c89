//! Bounded task queue.
//!
//! # Data Flow
//! ```text
//! submit(task)
//!     → bounded mpsc (capacity)            back-pressure on the caller
//!     → one of N consumer tasks
//!     → TaskRunner::run                    single worker, or a whole pool
//!     → oneshot reply                      caller waits ≤ submit_timeout
//! ```
//!
//! # Design Decisions
//! - Consumers poll with a bounded wait so clearing the running flag is
//!   observed within one poll interval
//! - The submission deadline is end to end and independent of the
//!   per-invocation deadline
//! - A caller whose deadline expires gets a timeout result; the job may
//!   still run and its late result is discarded

use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::QueueConfig;
use crate::load_balancer::descriptor::WorkerDescriptor;
use crate::observability::metrics;
use crate::pool::WorkerPool;
use crate::resilience::timeouts::with_deadline;
use crate::task::{Task, TaskEnvelope, TaskError, TaskResult};
use crate::transport::{InvokeError, Transport};

/// Whatever a queue consumer hands its jobs to.
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    async fn run(&self, envelope: TaskEnvelope) -> TaskResult;
}

/// One fixed backend, no selection or failover.
pub struct SingleWorker {
    worker: WorkerDescriptor,
    transport: Arc<dyn Transport>,
    invoke_timeout: Duration,
}

impl SingleWorker {
    pub fn new(
        worker: WorkerDescriptor,
        transport: Arc<dyn Transport>,
        invoke_timeout: Duration,
    ) -> Self {
        Self {
            worker,
            transport,
            invoke_timeout,
        }
    }
}

#[async_trait]
impl TaskRunner for SingleWorker {
    async fn run(&self, envelope: TaskEnvelope) -> TaskResult {
        let call = self.transport.invoke(&self.worker, &envelope.task);
        let outcome = with_deadline(self.invoke_timeout, async {
            AssertUnwindSafe(call)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(InvokeError::Remote("transport panicked".into())))
        })
        .await;

        match outcome {
            Ok(output) => TaskResult::success(envelope.id, self.worker.id.clone(), 1, output),
            Err(source) => {
                tracing::warn!(
                    task_id = %envelope.id,
                    worker = %self.worker.id,
                    error = %source,
                    "Queued task failed"
                );
                let error = TaskError::Invocation {
                    worker_id: self.worker.id.clone(),
                    source,
                };
                TaskResult::failure(envelope.id, &error, 1)
            }
        }
    }
}

#[async_trait]
impl TaskRunner for WorkerPool {
    async fn run(&self, envelope: TaskEnvelope) -> TaskResult {
        self.execute_envelope(envelope).await
    }
}

struct Job {
    envelope: TaskEnvelope,
    reply: oneshot::Sender<TaskResult>,
}

/// Fire-and-wait front end with a fixed pool of consumers.
pub struct TaskQueue {
    tx: mpsc::Sender<Job>,
    running: Arc<AtomicBool>,
    consumers: Mutex<Vec<JoinHandle<()>>>,
    submit_timeout: Duration,
}

impl TaskQueue {
    /// Spawn `config.consumers` consumer tasks feeding `runner`.
    pub fn start(runner: Arc<dyn TaskRunner>, config: &QueueConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let running = Arc::new(AtomicBool::new(true));
        let poll_interval = Duration::from_millis(config.poll_interval_ms.max(1));

        let consumers = (0..config.consumers.max(1))
            .map(|index| {
                tokio::spawn(consume(
                    index,
                    rx.clone(),
                    running.clone(),
                    runner.clone(),
                    poll_interval,
                ))
            })
            .collect();

        tracing::info!(
            consumers = config.consumers,
            capacity = config.capacity,
            "Task queue started"
        );

        Self {
            tx,
            running,
            consumers: Mutex::new(consumers),
            submit_timeout: Duration::from_secs(config.submit_timeout_secs),
        }
    }

    /// Queue a single worker behind `transport`.
    pub fn for_worker(
        worker: WorkerDescriptor,
        transport: Arc<dyn Transport>,
        invoke_timeout: Duration,
        config: &QueueConfig,
    ) -> Self {
        Self::start(
            Arc::new(SingleWorker::new(worker, transport, invoke_timeout)),
            config,
        )
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Enqueue `task` and wait for its result, at most `submit_timeout`.
    pub async fn submit(&self, task: Task) -> TaskResult {
        let envelope = TaskEnvelope::new(task);
        let task_id = envelope.id;

        if !self.is_running() {
            metrics::record_queue_submission("closed");
            return TaskResult::failure(task_id, &TaskError::QueueClosed, 0);
        }

        let (reply, reply_rx) = oneshot::channel();
        let job = Job { envelope, reply };

        let waited = tokio::time::timeout(self.submit_timeout, async {
            self.tx.send(job).await.map_err(|_| TaskError::QueueClosed)?;
            reply_rx.await.map_err(|_| TaskError::QueueClosed)
        })
        .await;

        match waited {
            Ok(Ok(result)) => {
                let outcome = if result.success { "success" } else { "failure" };
                metrics::record_queue_submission(outcome);
                result
            }
            Ok(Err(error)) => {
                metrics::record_queue_submission("closed");
                TaskResult::failure(task_id, &error, 0)
            }
            Err(_) => {
                tracing::warn!(
                    task_id = %task_id,
                    timeout = ?self.submit_timeout,
                    "Queued task timed out"
                );
                metrics::record_queue_submission("timeout");
                TaskResult::failure(task_id, &TaskError::SubmitTimeout(self.submit_timeout), 0)
            }
        }
    }

    /// Clear the running flag and wait for every consumer to exit.
    ///
    /// Jobs still queued are dropped; their submitters see `queue_closed`.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        let consumers = std::mem::take(
            &mut *self.consumers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in consumers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Queue consumer failed");
            }
        }
        tracing::info!("Task queue stopped");
    }
}

async fn consume(
    index: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    running: Arc<AtomicBool>,
    runner: Arc<dyn TaskRunner>,
    poll_interval: Duration,
) {
    tracing::debug!(consumer = index, "Queue consumer started");

    while running.load(Ordering::Acquire) {
        let next =
            tokio::time::timeout(poll_interval, async { rx.lock().await.recv().await }).await;
        let job = match next {
            Err(_) => continue,
            Ok(None) => break,
            Ok(Some(job)) => job,
        };

        let result = runner.run(job.envelope).await;
        if job.reply.send(result).is_err() {
            tracing::debug!(consumer = index, "Submitter gone, dropping result");
        }
    }

    // Anything left in the channel dies with the receiver.
    rx.lock().await.close();
    tracing::debug!(consumer = index, "Queue consumer stopped");
}
