//! Shared types, errors, and the capability trait for the Guided Agent Flow Engine.

pub mod config;
pub mod context;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{EngineConfig, EngineConfigBuilder, ModelConfig};
pub use context::{ContextResource, ContextResourceKind, DiscoveryAxis, DiscoverySets, RuntimeContext};
pub use error::{FieldError, GafError, Result, WorkflowValidationError};
pub use traits::Capability;
pub use types::{AgentInput, AgentOutput, ComponentId, ComponentMetadata};
