//! Task outcomes as seen by callers.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::transport::InvokeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub analysis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeOutput {
    pub entries: Vec<serde_json::Value>,
}

/// Typed payload returned by a worker, one shape per task kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskOutput {
    Analysis(AnalysisOutput),
    Embeddings(EmbeddingOutput),
    Knowledge(KnowledgeOutput),
}

/// Why a task did not complete.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("no workers available")]
    NoWorkersAvailable,

    #[error("worker {worker_id} failed: {source}")]
    Invocation {
        worker_id: String,
        #[source]
        source: InvokeError,
    },

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("submission timed out after {0:?}")]
    SubmitTimeout(Duration),

    #[error("task queue is shut down")]
    QueueClosed,
}

impl TaskError {
    /// Stable machine-readable label.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::NoWorkersAvailable => "no_workers_available",
            TaskError::Invocation {
                source: InvokeError::Timeout(_),
                ..
            } => "timeout",
            TaskError::Invocation { .. } => "invocation_failed",
            TaskError::InvalidTask(_) => "invalid_task",
            TaskError::SubmitTimeout(_) => "timeout",
            TaskError::QueueClosed => "queue_closed",
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// What a caller gets back: always a value, never a fault.
///
/// Serializes flat as `{success, error?, fallback?, ...payload}`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub task_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// The pool gave up; the caller should use its alternative path.
    #[serde(skip_serializing_if = "is_false")]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    pub attempts: u32,
    #[serde(flatten)]
    pub output: Option<TaskOutput>,
}

impl TaskResult {
    pub fn success(task_id: Uuid, worker_id: String, attempts: u32, output: TaskOutput) -> Self {
        Self {
            task_id,
            success: true,
            error: None,
            error_kind: None,
            fallback: false,
            worker_id: Some(worker_id),
            attempts,
            output: Some(output),
        }
    }

    pub fn failure(task_id: Uuid, error: &TaskError, attempts: u32) -> Self {
        Self {
            task_id,
            success: false,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            fallback: true,
            worker_id: None,
            attempts,
            output: None,
        }
    }
}
