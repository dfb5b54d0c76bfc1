//! Dynamic Agent Factory: turns a discovered workflow template into a
//! named, single-tool agent that runs it (spec §4.7).

use async_trait::async_trait;
use gaf_core::{AgentInput, AgentOutput, Capability, ComponentMetadata, Result};
use gaf_engine::FlowEngine;
use gaf_template::{WorkflowSource, WorkflowTemplate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

static NON_IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Replace every non-alphanumeric/underscore byte with `_`, then prefix an
/// underscore if the result doesn't already start with a letter or
/// underscore (spec §4.7 agent construction).
pub fn sanitize_identifier(name: &str) -> String {
    let mut sanitized = NON_IDENTIFIER_RE.replace_all(name, "_").to_string();
    let starts_valid = sanitized
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !starts_valid {
        sanitized = format!("_{sanitized}");
    }
    sanitized
}

/// The exposed agent name for a discovered workflow: the sanitized workflow
/// name, `Contrib_`-prefixed when the workflow came from the contrib
/// source to avoid colliding with a core workflow of the same name.
pub fn agent_name_for(template: &WorkflowTemplate) -> String {
    let sanitized = sanitize_identifier(&template.workflow_name);
    match template.source {
        WorkflowSource::Contrib => format!("Contrib_{sanitized}"),
        WorkflowSource::Core => sanitized,
    }
}

fn build_instructions(template: &WorkflowTemplate) -> String {
    let mut instructions = format!(
        "You are the workflow executor agent for \"{}\". {}\n",
        template.workflow_name, template.description
    );
    let phase_names: Vec<&str> = template.core_phases.values().map(|p| p.name.as_str()).collect();
    instructions.push_str(&format!("Phases: {}\n", phase_names.join(", ")));

    let mut dependency_agents: Vec<&str> = template.agent_dependencies.values().map(|d| d.agent_id.as_str()).collect();
    dependency_agents.sort_unstable();
    instructions.push_str(&format!("Dependency agents: {}\n", dependency_agents.join(", ")));

    instructions.push_str("Use the `execute_workflow` tool to run this workflow against the platform.\n");

    if let Some(workflow_instructions) = &template.workflow_instructions {
        if !workflow_instructions.focus_areas.is_empty() {
            instructions.push_str(&format!(
                "Focus areas: {}\n",
                workflow_instructions.focus_areas.join(", ")
            ));
        }
    }
    instructions
}

/// A single discovered workflow, materialized as a one-tool agent.
pub struct WorkflowExecutorAgent {
    metadata: ComponentMetadata,
    instructions: String,
    template: WorkflowTemplate,
    engine: Arc<FlowEngine>,
}

impl WorkflowExecutorAgent {
    pub fn new(template: WorkflowTemplate, engine: Arc<FlowEngine>) -> Self {
        let name = agent_name_for(&template);
        let instructions = build_instructions(&template);
        let metadata = ComponentMetadata::new(name, template.description.clone());
        Self {
            metadata,
            instructions,
            template,
            engine,
        }
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Run the stored template against `request`, extracting a `TARGET`
    /// override from it first, and format the result (spec §4.7 parameter
    /// extraction + result formatting).
    pub async fn execute_workflow(&self, request: &str) -> String {
        let mut context = HashMap::new();
        if let Some((key, value)) = FlowEngine::extract_target_override(request) {
            tracing::debug!(key = %key, value = %value, "extracted parameter override from request");
            context.insert(key, value);
        }
        let result = self.engine.execute(&self.template, context).await;
        format_result(&result)
    }
}

#[async_trait]
impl Capability for WorkflowExecutorAgent {
    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    async fn execute(&self, input: AgentInput) -> Result<AgentOutput> {
        let text = self.execute_workflow(&input.prompt).await;
        Ok(AgentOutput::text(text))
    }

    fn tool_set(&self) -> Vec<String> {
        vec!["execute_workflow".to_string()]
    }
}

fn format_result(result: &gaf_engine::FlowExecutionResult) -> String {
    let mut out = format!(
        "Workflow: {} — {}\n",
        result.workflow_name,
        if result.success { "SUCCESS" } else { "FAILED" }
    );
    for phase in &result.phases {
        out.push_str(&format!(
            "- {} ({} tasks): {}\n",
            phase.phase_name,
            phase.tasks.len(),
            if phase.success { "ok" } else { "failed" }
        ));
        for task in &phase.tasks {
            let marker = if task.success { "\u{2713}" } else { "\u{2717}" };
            let detail = if task.success {
                format!("{} fields returned", task.data.len())
            } else {
                task.error.clone().unwrap_or_else(|| "unknown error".to_string())
            };
            out.push_str(&format!("    {marker} {}: {detail}\n", task.task_id));
        }
    }
    out
}
