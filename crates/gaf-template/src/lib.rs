//! Workflow template data model and validation (spec §3, §4.1).

pub mod model;
pub mod validator;

pub use model::{
    AgentDependency, ComplexityLevel, DataRequirements, ExecutionMode, LLMLoopConfig,
    TaskContextResourceRef, TaskResultInterpretation, TaskValidation, WorkflowCategory,
    WorkflowInstructions, WorkflowPhase, WorkflowSource, WorkflowStability, WorkflowTask,
    WorkflowTemplate, WorkflowType,
};
pub use validator::{load_legacy, TemplateValidator, ValidationRule};
