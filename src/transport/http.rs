//! HTTP/JSON transport.
//!
//! `POST {endpoint}/v1/tasks` with the tagged task as body; `GET {endpoint}{path}` to probe.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::{HealthCheckConfig, TimeoutConfig};
use crate::load_balancer::descriptor::WorkerDescriptor;
use crate::task::result::{AnalysisOutput, EmbeddingOutput, KnowledgeOutput};
use crate::task::{Task, TaskOutput};
use crate::transport::{InvokeError, Transport};

const TASKS_PATH: &str = "v1/tasks";

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    request_timeout: Duration,
    probe_timeout: Duration,
    probe_path: String,
}

impl HttpTransport {
    pub fn new(timeouts: &TimeoutConfig, health: &HealthCheckConfig) -> Result<Self, InvokeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .user_agent(concat!("inference-pool/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InvokeError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            request_timeout: timeouts.invoke(),
            probe_timeout: Duration::from_secs(health.timeout_secs),
            probe_path: health.path.clone(),
        })
    }

    fn map_error(&self, e: reqwest::Error, timeout: Duration) -> InvokeError {
        if e.is_timeout() {
            InvokeError::Timeout(timeout)
        } else if e.is_decode() {
            InvokeError::Decode(e.to_string())
        } else {
            InvokeError::Connection(e.to_string())
        }
    }
}

/// Turn a worker's JSON reply into the output shape for `task`.
pub fn decode_output(task: &Task, body: Value) -> Result<TaskOutput, InvokeError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(InvokeError::Remote(message));
    }

    let decoded = match task {
        Task::Analysis(_) => serde_json::from_value::<AnalysisOutput>(body).map(TaskOutput::Analysis),
        Task::BatchEmbedding(_) => {
            serde_json::from_value::<EmbeddingOutput>(body).map(TaskOutput::Embeddings)
        }
        Task::KnowledgeProcessing(_) => {
            serde_json::from_value::<KnowledgeOutput>(body).map(TaskOutput::Knowledge)
        }
    };
    decoded.map_err(|e| InvokeError::Decode(e.to_string()))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn invoke(
        &self,
        worker: &WorkerDescriptor,
        task: &Task,
    ) -> Result<TaskOutput, InvokeError> {
        let url = worker
            .endpoint
            .join(TASKS_PATH)
            .map_err(|e| InvokeError::Connection(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .json(task)
            .send()
            .await
            .map_err(|e| self.map_error(e, self.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InvokeError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.map_error(e, self.request_timeout))?;
        decode_output(task, body)
    }

    async fn probe(&self, worker: &WorkerDescriptor) -> Result<(), InvokeError> {
        let url = worker
            .endpoint
            .join(&self.probe_path)
            .map_err(|e| InvokeError::Connection(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| self.map_error(e, self.probe_timeout))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(InvokeError::Status {
                code: status.as_u16(),
                body: String::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::BatchEmbeddingRequest;
    use serde_json::json;

    fn embedding_task() -> Task {
        Task::BatchEmbedding(BatchEmbeddingRequest {
            texts: vec!["hello".into()],
            model: None,
        })
    }

    #[test]
    fn test_decode_output() {
        let output = decode_output(&embedding_task(), json!({ "embeddings": [[1.0, 2.0]] })).unwrap();
        assert_eq!(
            output,
            TaskOutput::Embeddings(EmbeddingOutput {
                embeddings: vec![vec![1.0, 2.0]]
            })
        );
    }

    #[test]
    fn test_error_payload_is_failure() {
        let err = decode_output(&embedding_task(), json!({ "error": "CUDA out of memory" })).unwrap_err();
        assert_eq!(err, InvokeError::Remote("CUDA out of memory".into()));
    }

    #[test]
    fn test_null_error_ignored() {
        assert!(decode_output(&embedding_task(), json!({ "error": null, "embeddings": [] })).is_ok());
    }

    #[test]
    fn test_wrong_shape_is_decode_error() {
        let err = decode_output(&embedding_task(), json!({ "analysis": "text" })).unwrap_err();
        assert!(matches!(err, InvokeError::Decode(_)));
    }
}
