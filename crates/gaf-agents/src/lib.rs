//! Named-agent coordination and bounded micro-agent fan-out (spec §4.4, §4.5).

pub mod coordinator;
pub mod micro_agent;

pub use coordinator::AgentCoordinator;
pub use micro_agent::{MicroAgentBuilder, MicroAgentConfig, MicroAgentResult};
