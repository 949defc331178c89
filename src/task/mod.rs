//! Task kinds accepted by the pool.
//!
//! Each kind carries its own typed request; the executor never looks inside
//! it, it only hands the task to a [`Transport`](crate::transport::Transport).

pub mod result;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use result::{TaskError, TaskOutput, TaskResult};

/// Free-form analysis of a piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Embed a batch of texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEmbeddingRequest {
    pub texts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Extract knowledge entries from documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRequest {
    pub documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// A unit of work routed to one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task_type", content = "data", rename_all = "snake_case")]
pub enum Task {
    Analysis(AnalysisRequest),
    BatchEmbedding(BatchEmbeddingRequest),
    KnowledgeProcessing(KnowledgeRequest),
}

impl Task {
    /// Build a task from the string/map submission form.
    pub fn from_parts(task_type: &str, data: serde_json::Value) -> Result<Self, TaskError> {
        let tagged = serde_json::json!({ "task_type": task_type, "data": data });
        serde_json::from_value(tagged)
            .map_err(|e| TaskError::InvalidTask(format!("{}: {}", task_type, e)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Task::Analysis(_) => "analysis",
            Task::BatchEmbedding(_) => "batch_embedding",
            Task::KnowledgeProcessing(_) => "knowledge_processing",
        }
    }
}

/// A task paired with an id for log correlation.
#[derive(Debug, Clone)]
pub struct TaskEnvelope {
    pub id: Uuid,
    pub task: Task,
}

impl TaskEnvelope {
    pub fn new(task: Task) -> Self {
        Self {
            id: Uuid::new_v4(),
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_parts() {
        let task = Task::from_parts("batch_embedding", json!({ "texts": ["a", "b"] })).unwrap();
        assert_eq!(
            task,
            Task::BatchEmbedding(BatchEmbeddingRequest {
                texts: vec!["a".into(), "b".into()],
                model: None,
            })
        );
        assert_eq!(task.kind(), "batch_embedding");
    }

    #[test]
    fn test_from_parts_rejects_unknown_kind() {
        let err = Task::from_parts("translate", json!({})).unwrap_err();
        assert!(matches!(err, TaskError::InvalidTask(msg) if msg.starts_with("translate")));
    }

    #[test]
    fn test_from_parts_rejects_bad_data() {
        assert!(Task::from_parts("analysis", json!({ "text": "missing content" })).is_err());
    }

    #[test]
    fn test_wire_shape() {
        let task = Task::Analysis(AnalysisRequest {
            content: "fn main() {}".into(),
            context: None,
            instructions: None,
        });
        assert_eq!(
            serde_json::to_value(&task).unwrap(),
            json!({ "task_type": "analysis", "data": { "content": "fn main() {}" } })
        );
    }
}
