//! Named-agent registry and the small set of coordinator operations every
//! task dispatch goes through (spec §4.4).

use gaf_core::{AgentInput, AgentOutput, Capability, GafError, Result};
use gaf_template::TaskContextResourceRef;
use gaf_core::ContextResource;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds every registered external collaborator by name and exposes the
/// handful of operations tasks actually need, so callers never touch the
/// registry directly.
///
/// Failures here are returned, never panicked on: a missing or failing
/// agent becomes task-result data further up the call stack, not a crashed
/// process (spec §7 containment policy).
pub struct AgentCoordinator {
    agents: RwLock<HashMap<String, Arc<dyn Capability>>>,
}

impl AgentCoordinator {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, name: impl Into<String>, agent: Arc<dyn Capability>) {
        self.agents.write().await.insert(name.into(), agent);
    }

    pub async fn get_agent(&self, name: &str) -> Result<Arc<dyn Capability>> {
        self.agents
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| GafError::AgentUnavailable {
                name: name.to_string(),
            })
    }

    /// Ask `agent_name` to validate a candidate query/search against the
    /// given criteria before it is executed.
    pub async fn validate_search(
        &self,
        agent_name: &str,
        query: &str,
        criteria: &[String],
    ) -> Result<AgentOutput> {
        let agent = self.get_agent(agent_name).await?;
        let input = AgentInput::new(format!(
            "Validate the following query against these criteria: {}\n\nQuery:\n{query}",
            criteria.join(", ")
        ));
        agent
            .execute(input)
            .await
            .map_err(|e| GafError::QueryValidation {
                agent: agent_name.to_string(),
                message: e.to_string(),
            })
    }

    /// Run a search/query via `agent_name`.
    pub async fn execute_search(
        &self,
        agent_name: &str,
        query: &str,
        parameters: &HashMap<String, serde_json::Value>,
    ) -> Result<AgentOutput> {
        let agent = self.get_agent(agent_name).await?;
        let mut input = AgentInput::new(query);
        for (k, v) in parameters {
            input = input.with_parameter(k.clone(), v.clone());
        }
        agent
            .execute(input)
            .await
            .map_err(|e| GafError::QueryExecution {
                message: format!("{agent_name}: {e}"),
            })
    }

    /// Ask `agent_name` to synthesize a set of prior results into one
    /// summary output.
    pub async fn synthesize_results(
        &self,
        agent_name: &str,
        results: &[AgentOutput],
        prompt: Option<&str>,
    ) -> Result<AgentOutput> {
        let agent = self.get_agent(agent_name).await?;
        let joined = results
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");
        let prompt = prompt.unwrap_or("Synthesize the following results into one summary:");
        agent
            .execute(AgentInput::new(format!("{prompt}\n\n{joined}")))
            .await
    }

    /// Materialize task-declared context-resource references into loaded
    /// resources, ordered highest priority first. No fetching happens here:
    /// the engine owns the loader for each `ContextResourceKind`; this just
    /// establishes the deterministic ordering every loader relies on.
    pub fn order_context_resources(
        &self,
        refs: &[TaskContextResourceRef],
    ) -> Vec<ContextResource> {
        let mut resources: Vec<ContextResource> = refs
            .iter()
            .map(|r| ContextResource {
                kind: r.kind,
                id: r.id.clone(),
                description: r.description.clone(),
                parameters: r.parameters.clone(),
                priority: r.priority,
            })
            .collect();
        resources.sort_by(|a, b| b.priority.cmp(&a.priority));
        resources
    }
}

impl Default for AgentCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
