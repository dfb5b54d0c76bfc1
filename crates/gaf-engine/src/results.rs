//! Result and progress-event shapes produced by the Flow Engine (spec §3, §6).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Starting,
    InProgress,
    Completed,
    Error,
}

/// One progress notification. Consumers of a serialized stream of these
/// should tolerate status values this engine does not currently emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase_name: Option<String>,
    pub task_id: Option<String>,
    pub message: String,
    pub status: ProgressStatus,
    pub data: Option<serde_json::Value>,
}

impl ProgressEvent {
    pub fn phase(phase_name: impl Into<String>, status: ProgressStatus, message: impl Into<String>) -> Self {
        Self {
            phase_name: Some(phase_name.into()),
            task_id: None,
            message: message.into(),
            status,
            data: None,
        }
    }

    pub fn task(
        phase_name: impl Into<String>,
        task_id: impl Into<String>,
        status: ProgressStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            phase_name: Some(phase_name.into()),
            task_id: Some(task_id.into()),
            message: message.into(),
            status,
            data: None,
        }
    }
}

/// Receives progress notifications during `FlowEngine::execute`. Errors
/// raised by an implementation are caught and logged by the engine, never
/// propagated (spec §5).
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// A sink that drops every event, for callers with no UI to drive.
pub struct NullProgressSink;
impl ProgressSink for NullProgressSink {
    fn on_event(&self, _event: ProgressEvent) {}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMStepResult {
    pub step_number: u32,
    pub tool_used: Option<String>,
    pub tool_output: Option<serde_json::Value>,
    pub llm_reasoning: String,
    pub next_action: String,
    pub step_complete: bool,
    pub context_loaded: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub success: bool,
    pub data: HashMap<String, serde_json::Value>,
    pub error: Option<String>,
    #[serde(with = "duration_secs_f64")]
    pub execution_time: Duration,
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub llm_steps: Vec<LLMStepResult>,
}

impl TaskResult {
    pub fn success(task_id: impl Into<String>, data: HashMap<String, serde_json::Value>, execution_time: Duration) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            data,
            error: None,
            execution_time,
            metadata: HashMap::new(),
            llm_steps: Vec::new(),
        }
    }

    pub fn failure(task_id: impl Into<String>, error: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            data: HashMap::new(),
            error: Some(error.into()),
            execution_time,
            metadata: HashMap::new(),
            llm_steps: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase_name: String,
    pub success: bool,
    pub tasks: Vec<TaskResult>,
    #[serde(with = "duration_secs_f64")]
    pub execution_time: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowExecutionResult {
    pub workflow_name: String,
    pub success: bool,
    pub phases: Vec<PhaseResult>,
    pub synthesized_output: serde_json::Value,
    #[serde(with = "duration_secs_f64")]
    pub total_execution_time: Duration,
    pub error_summary: Option<String>,
}

mod duration_secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
