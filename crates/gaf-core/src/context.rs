//! Runtime context carried through a single workflow invocation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The three canonical discovery axes the engine treats as opaque string
/// axes (the real key names are external-platform-specific; `sourcetype`,
/// `host`, `source` are simply the names this engine was built against).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscoveryAxis {
    Sourcetype,
    Host,
    Source,
}

impl DiscoveryAxis {
    pub const ALL: [DiscoveryAxis; 3] = [
        DiscoveryAxis::Sourcetype,
        DiscoveryAxis::Host,
        DiscoveryAxis::Source,
    ];

    /// The raw-record key this axis harvests values from.
    pub fn record_key(self) -> &'static str {
        match self {
            DiscoveryAxis::Sourcetype => "sourcetype",
            DiscoveryAxis::Host => "host",
            DiscoveryAxis::Source => "source",
        }
    }

    /// The uppercase placeholder key a per-fan-out task substitutes this
    /// axis's current value under.
    pub fn placeholder_key(self) -> &'static str {
        match self {
            DiscoveryAxis::Sourcetype => "SOURCETYPE",
            DiscoveryAxis::Host => "HOST",
            DiscoveryAxis::Source => "SOURCE",
        }
    }
}

/// Deduplicated, append-only lists of values surfaced by prior phases.
///
/// Values are only ever added, never removed (spec §5, §8 discovery
/// monotonicity), and membership is checked with a linear scan since sets
/// stay small (tens, not millions, of distinct values per workflow run).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverySets {
    sourcetypes: Vec<String>,
    hosts: Vec<String>,
    sources: Vec<String>,
}

impl DiscoverySets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self, axis: DiscoveryAxis) -> &[String] {
        match axis {
            DiscoveryAxis::Sourcetype => &self.sourcetypes,
            DiscoveryAxis::Host => &self.hosts,
            DiscoveryAxis::Source => &self.sources,
        }
    }

    /// Insert a value if not already present. Returns `true` if it was new.
    pub fn insert(&mut self, axis: DiscoveryAxis, value: impl Into<String>) -> bool {
        let value = value.into();
        let bucket = match axis {
            DiscoveryAxis::Sourcetype => &mut self.sourcetypes,
            DiscoveryAxis::Host => &mut self.hosts,
            DiscoveryAxis::Source => &mut self.sources,
        };
        if bucket.iter().any(|v| v == &value) {
            false
        } else {
            bucket.push(value);
            true
        }
    }

    pub fn is_empty_for(&self, axis: DiscoveryAxis) -> bool {
        self.values(axis).is_empty()
    }
}

/// A resource loaded before a task's LLM-loop execution: a tool, a piece of
/// documentation, or reference material. Materialized at task start and
/// discarded at task end; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResource {
    pub kind: ContextResourceKind,
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextResourceKind {
    Tool,
    Documentation,
    Reference,
}

/// The single-writer context the Flow Engine owns for the duration of one
/// workflow invocation. Never exposed to micro-agents for mutation.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    /// Workflow-wide placeholder values, e.g. `TARGET`.
    pub workflow: HashMap<String, String>,
    /// Discovery sets harvested from successful tasks, keyed by discovery
    /// axis (spec §4.6.3).
    pub discovered: DiscoverySets,
    /// `<phase_name>_synthesis` entries, populated as phases complete.
    pub phase_synthesis: HashMap<String, serde_json::Value>,
}

impl RuntimeContext {
    pub fn seeded(workflow: HashMap<String, String>) -> Self {
        Self {
            workflow,
            ..Default::default()
        }
    }

    pub fn record_phase_synthesis(&mut self, phase_name: &str, synthesis: serde_json::Value) {
        self.phase_synthesis
            .insert(format!("{phase_name}_synthesis"), synthesis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_sets_are_append_only_and_deduped() {
        let mut sets = DiscoverySets::new();
        assert!(sets.insert(DiscoveryAxis::Sourcetype, "access_combined"));
        assert!(!sets.insert(DiscoveryAxis::Sourcetype, "access_combined"));
        assert_eq!(sets.values(DiscoveryAxis::Sourcetype), &["access_combined"]);
        assert!(sets.is_empty_for(DiscoveryAxis::Host));
    }

    #[test]
    fn runtime_context_records_phase_synthesis_under_suffixed_key() {
        let mut ctx = RuntimeContext::default();
        ctx.record_phase_synthesis("discovery", serde_json::json!({"success": true}));
        assert!(ctx.phase_synthesis.contains_key("discovery_synthesis"));
    }
}
