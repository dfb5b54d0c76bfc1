//! The typed capability set every named external agent is consumed through.
//!
//! Replaces duck-typed agent objects and reflection-based "is this an agent"
//! checks with a single async trait: the Agent Coordinator and Micro-Agent
//! Builder hold nothing but `Arc<dyn Capability>`.

use crate::types::{AgentInput, AgentOutput, ComponentMetadata};
use crate::Result;
use async_trait::async_trait;

/// A named external collaborator exposing a uniform "execute prompt ->
/// textual response" operation, possibly with a bounded tool set.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Identity and description of this collaborator.
    fn metadata(&self) -> &ComponentMetadata;

    /// Run the collaborator against the given input.
    async fn execute(&self, input: AgentInput) -> Result<AgentOutput>;

    /// Tools this collaborator exposes, if any (e.g. a platform-access agent
    /// exposing a family of sub-capabilities). Empty by default.
    fn tool_set(&self) -> Vec<String> {
        Vec::new()
    }
}

impl std::fmt::Debug for dyn Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("metadata", self.metadata())
            .finish()
    }
}
