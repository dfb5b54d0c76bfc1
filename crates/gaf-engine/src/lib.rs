//! The Flow Engine: executes a [`gaf_template::WorkflowTemplate`] phase by
//! phase, dispatching tasks through an [`gaf_agents::AgentCoordinator`] and
//! producing a [`results::FlowExecutionResult`] (spec §4.6).

pub mod engine;
pub mod harvest;
pub mod results;
pub mod synthesis;

pub use engine::FlowEngine;
pub use results::{
    FlowExecutionResult, LLMStepResult, NullProgressSink, PhaseResult, ProgressEvent, ProgressSink,
    ProgressStatus, TaskResult,
};
