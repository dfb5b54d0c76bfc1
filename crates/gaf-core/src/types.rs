//! Shared value types: component identity, agent input/output.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A stable identifier for a component (agent, workflow executor, micro-agent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId(Uuid);

impl ComponentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id derived from a name, so the same logical component
    /// (e.g. the same discovered workflow) gets the same id across runs.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity and provenance for a component in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub id: ComponentId,
    pub name: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ComponentMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ComponentId::from_name(&name),
            name,
            description: description.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

/// Input handed to a [`crate::traits::Capability`] on `execute`.
///
/// Mirrors the prompt-plus-parameters shape every agent call in the engine
/// actually needs: a natural-language prompt, a free-form parameter map
/// (queries, resolved task metadata, ...), and an optional list of tool
/// names the callee is bounded to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentInput {
    pub prompt: String,
    pub parameters: HashMap<String, serde_json::Value>,
    pub allowed_tools: Vec<String>,
}

impl AgentInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            parameters: HashMap::new(),
            allowed_tools: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = tools;
        self
    }
}

/// Output produced by a [`crate::traits::Capability`] on `execute`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentOutput {
    pub text: String,
    pub data: HashMap<String, serde_json::Value>,
}

impl AgentOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: HashMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}
