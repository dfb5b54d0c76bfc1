//! Engine-wide configuration (SPEC_FULL.md §10.4).

use std::path::PathBuf;

/// Opaque model/generation knobs forwarded into micro-agent configs. The
/// engine never interprets these; the LLM runtime they describe is out of
/// scope (spec §1).
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub primary_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            primary_model: "default".to_string(),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

/// Process-wide default configuration for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub micro_agent_timeout_secs: u64,
    pub max_parallel_default: usize,
    pub discovery_roots: Vec<PathBuf>,
    pub model: ModelConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            micro_agent_timeout_secs: 120,
            max_parallel_default: 4,
            discovery_roots: vec![
                PathBuf::from("core/flows"),
                PathBuf::from("contrib/flows"),
            ],
            model: ModelConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Apply `GAF_`-prefixed environment overrides on top of the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("GAF_MICRO_AGENT_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse() {
                config.micro_agent_timeout_secs = parsed;
            }
        }
        if let Ok(v) = std::env::var("GAF_MAX_PARALLEL_DEFAULT") {
            if let Ok(parsed) = v.parse() {
                config.max_parallel_default = parsed;
            }
        }
        config
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn micro_agent_timeout_secs(mut self, secs: u64) -> Self {
        self.config.micro_agent_timeout_secs = secs;
        self
    }

    pub fn max_parallel_default(mut self, n: usize) -> Self {
        self.config.max_parallel_default = n;
        self
    }

    pub fn discovery_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.config.discovery_roots = roots;
        self
    }

    pub fn model(mut self, model: ModelConfig) -> Self {
        self.config.model = model;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
