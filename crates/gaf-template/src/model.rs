//! The workflow template data model (spec §3, §4.1).
//!
//! Field shapes and cross-field invariants are grounded on the Pydantic
//! model this system's templates were originally validated against
//! (`WorkflowTemplate`, `WorkflowPhase`, `WorkflowTask` and friends); unknown
//! fields are accepted and ignored rather than rejected, matching the
//! "closed but forward-compatible" validation policy.

use gaf_core::ContextResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Analysis,
    Troubleshooting,
    Performance,
    Monitoring,
    Onboarding,
    Security,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowCategory {
    DataAnalysis,
    SystemHealth,
    SecurityAudit,
    PerformanceTuning,
    InfrastructureMonitoring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowSource {
    Core,
    Contrib,
}

impl WorkflowSource {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowSource::Core => "core",
            WorkflowSource::Contrib => "contrib",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStability {
    Stable,
    Experimental,
    Deprecated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataRequirements {
    #[serde(default)]
    pub minimum_events: Option<u64>,
    #[serde(default)]
    pub required_sourcetypes: Option<Vec<String>>,
    #[serde(default)]
    pub optional_fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDependency {
    pub agent_id: String,
    pub description: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub capabilities: Option<Vec<String>>,
    #[serde(default)]
    pub integration_points: Option<Vec<String>>,
    #[serde(default)]
    pub tools: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstructions {
    pub specialization: String,
    pub focus_areas: Vec<String>,
    pub execution_style: String,
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskValidation {
    pub agent: String,
    #[serde(default)]
    pub criteria: Option<Vec<String>>,
    /// Spec §4.1 ValidationContract fields: `validate_syntax`,
    /// `optimize_performance`, `per_fan_out_validation`.
    #[serde(default)]
    pub validate_syntax: bool,
    #[serde(default)]
    pub optimize_performance: bool,
    #[serde(default)]
    pub per_fan_out_validation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResultInterpretation {
    pub agent: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub interpret_results: bool,
    #[serde(default)]
    pub generate_insights: bool,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub output_format: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    Default,
    PerFanOut,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Default
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMLoopConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub context_resources: Vec<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub step_validation: bool,
    #[serde(default)]
    pub bounded_execution: bool,
    /// Declared but not enforced (SPEC_FULL §10.7 open question #3).
    #[serde(default)]
    pub consistency_checks: bool,
}

fn default_max_iterations() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContextResourceRef {
    pub kind: ContextResourceKind,
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTask {
    pub task_id: String,
    pub title: String,
    pub goal: String,
    pub tool: String,

    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub search_query: Option<String>,
    #[serde(default)]
    pub parameters: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub timeout_sec: Option<u64>,
    #[serde(default)]
    pub analysis_focus: Option<Vec<String>>,
    #[serde(default)]
    pub mandatory: Option<bool>,
    #[serde(default)]
    pub parallel: Option<bool>,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    #[serde(default)]
    pub validation: Option<TaskValidation>,
    #[serde(default)]
    pub result_interpretation: Option<TaskResultInterpretation>,
    #[serde(default)]
    pub llm_loop: Option<LLMLoopConfig>,
    #[serde(default)]
    pub context_resources: Vec<TaskContextResourceRef>,
    #[serde(default)]
    pub dynamic_instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowPhase {
    pub name: String,
    pub description: String,
    #[serde(default = "default_true")]
    pub mandatory: bool,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub max_parallel: Option<u32>,
    pub tasks: Vec<WorkflowTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub workflow_id: String,
    pub workflow_name: String,
    pub version: String,
    pub description: String,

    pub workflow_type: WorkflowType,
    pub workflow_category: WorkflowCategory,
    pub source: WorkflowSource,
    pub maintainer: String,
    pub stability: WorkflowStability,

    pub complexity_level: ComplexityLevel,
    pub estimated_duration: String,
    pub target_audience: Vec<String>,

    pub splunk_versions: Vec<String>,
    pub last_updated: String,
    pub documentation_url: String,

    pub prerequisites: Vec<String>,
    pub required_permissions: Vec<String>,
    pub data_requirements: DataRequirements,

    pub business_value: String,
    pub use_cases: Vec<String>,
    pub success_metrics: Vec<String>,
    /// Supplemented field (SPEC_FULL §10.6): not named by spec §3 but not
    /// excluded either; unknown-field policy keeps it around as a first-class
    /// optional attribute instead of silently discarding it.
    #[serde(default)]
    pub industry_focus: Vec<String>,

    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub workflow_instructions: Option<WorkflowInstructions>,
    pub agent_dependencies: HashMap<String, AgentDependency>,
    /// An "ordered map" per spec §3; preserved as declared by using an
    /// insertion-ordered map type at the call site (see `model::ordered`).
    pub core_phases: indexmap::IndexMap<String, WorkflowPhase>,

    #[serde(default)]
    pub execution_flow: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub output_structure: Option<HashMap<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_template_json() -> serde_json::Value {
        serde_json::json!({
            "workflow_id": "core.health_check",
            "workflow_name": "Health Check",
            "version": "1.0.0",
            "description": "Checks overall platform health end to end.",
            "workflow_type": "monitoring",
            "workflow_category": "system_health",
            "source": "core",
            "maintainer": "team",
            "stability": "stable",
            "complexity_level": "beginner",
            "estimated_duration": "2-5 minutes",
            "target_audience": ["ops"],
            "splunk_versions": ["8.0+"],
            "last_updated": "2024-01-01",
            "documentation_url": "./README.md",
            "prerequisites": ["platform_access"],
            "required_permissions": ["read"],
            "data_requirements": {"minimum_events": 0},
            "business_value": "Keeps operators informed of platform health.",
            "use_cases": ["daily health check"],
            "success_metrics": ["green status"],
            "agent_dependencies": {
                "executor": {"agent_id": "executor", "description": "runs queries", "required": true}
            },
            "core_phases": {
                "main": {
                    "name": "Main",
                    "description": "Run the check",
                    "mandatory": true,
                    "parallel": false,
                    "tasks": [
                        {"task_id": "t1", "title": "Check", "goal": "Verify health", "tool": "run_query"}
                    ]
                }
            }
        })
    }

    #[test]
    fn deserializes_minimal_template_from_json_skeleton() {
        let template: WorkflowTemplate = serde_json::from_value(minimal_template_json()).unwrap();
        assert_eq!(template.workflow_id, "core.health_check");
        assert_eq!(template.source, WorkflowSource::Core);
        assert_eq!(template.core_phases.len(), 1);
        assert_eq!(template.core_phases["main"].tasks.len(), 1);
    }

    #[test]
    fn unknown_top_level_fields_are_ignored_not_rejected() {
        let mut doc = minimal_template_json();
        doc.as_object_mut()
            .unwrap()
            .insert("some_future_field".to_string(), serde_json::json!(true));
        let template: WorkflowTemplate = serde_json::from_value(doc).unwrap();
        assert_eq!(template.workflow_id, "core.health_check");
    }

    #[test]
    fn industry_focus_defaults_to_empty_when_absent() {
        let template: WorkflowTemplate = serde_json::from_value(minimal_template_json()).unwrap();
        assert!(template.industry_focus.is_empty());
    }
}
