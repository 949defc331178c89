//! Scripted transport for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::load_balancer::descriptor::WorkerDescriptor;
use crate::task::result::AnalysisOutput;
use crate::task::{AnalysisRequest, Task, TaskOutput};
use crate::transport::{InvokeError, Transport};

#[derive(Debug, Clone)]
pub enum Behaviour {
    Succeed,
    Fail,
    Panic,
    Hang,
    Delay(Duration),
    DelayThenFail(Duration),
}

#[derive(Default)]
struct Inner {
    behaviours: HashMap<String, Behaviour>,
    unhealthy: HashMap<String, bool>,
    calls: Vec<String>,
    probes: usize,
    in_flight: HashMap<String, usize>,
    peak: HashMap<String, usize>,
}

/// Workers succeed unless told otherwise.
#[derive(Default)]
pub struct ScriptedTransport {
    inner: Mutex<Inner>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, worker: &str, behaviour: Behaviour) {
        self.inner.lock().unwrap().behaviours.insert(worker.to_string(), behaviour);
    }

    pub fn set_unhealthy(&self, worker: &str) {
        self.inner.lock().unwrap().unhealthy.insert(worker.to_string(), true);
    }

    /// Worker ids in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn probes(&self) -> usize {
        self.inner.lock().unwrap().probes
    }

    /// Highest number of simultaneous calls seen on `worker`.
    pub fn peak(&self, worker: &str) -> usize {
        self.inner.lock().unwrap().peak.get(worker).copied().unwrap_or(0)
    }

    fn enter(&self, worker: &str) -> Behaviour {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(worker.to_string());
        let now = {
            let count = inner.in_flight.entry(worker.to_string()).or_default();
            *count += 1;
            *count
        };
        let peak = inner.peak.entry(worker.to_string()).or_default();
        *peak = (*peak).max(now);
        inner
            .behaviours
            .get(worker)
            .cloned()
            .unwrap_or(Behaviour::Succeed)
    }

    fn leave(&self, worker: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(count) = inner.in_flight.get_mut(worker) {
            *count -= 1;
        }
    }
}

pub fn analysis_task() -> Task {
    Task::Analysis(AnalysisRequest {
        content: "SELECT * FROM users WHERE id = '$id'".into(),
        context: None,
        instructions: None,
    })
}

fn output(worker: &str) -> TaskOutput {
    TaskOutput::Analysis(AnalysisOutput {
        analysis: format!("handled by {}", worker),
        confidence: None,
    })
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn invoke(
        &self,
        worker: &WorkerDescriptor,
        _task: &Task,
    ) -> Result<TaskOutput, InvokeError> {
        let behaviour = self.enter(&worker.id);
        let result = match behaviour {
            Behaviour::Succeed => Ok(output(&worker.id)),
            Behaviour::Fail => Err(InvokeError::Remote("scripted failure".into())),
            Behaviour::Panic => {
                self.leave(&worker.id);
                panic!("scripted panic on {}", worker.id);
            }
            Behaviour::Hang => std::future::pending().await,
            Behaviour::Delay(d) => {
                tokio::time::sleep(d).await;
                Ok(output(&worker.id))
            }
            Behaviour::DelayThenFail(d) => {
                tokio::time::sleep(d).await;
                Err(InvokeError::Connection("scripted reset".into()))
            }
        };
        self.leave(&worker.id);
        result
    }

    async fn probe(&self, worker: &WorkerDescriptor) -> Result<(), InvokeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.probes += 1;
        if inner.unhealthy.get(&worker.id).copied().unwrap_or(false) {
            Err(InvokeError::Connection("connection refused".into()))
        } else {
            Ok(())
        }
    }
}
