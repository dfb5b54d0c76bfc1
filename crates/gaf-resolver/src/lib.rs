//! Placeholder substitution over task text and parameters (spec §4.3).
//!
//! A placeholder is a bare `{NAME}` token. Resolution is a single pass of
//! exact-token replacement, merging workflow-wide context with task-local
//! overrides; any token with no matching key is left untouched rather than
//! erroring, matching the original builder's pass-through behavior.

use gaf_core::{DiscoveryAxis, RuntimeContext};
use std::collections::HashMap;

pub struct PlaceholderResolver<'a> {
    context: &'a RuntimeContext,
}

impl<'a> PlaceholderResolver<'a> {
    pub fn new(context: &'a RuntimeContext) -> Self {
        Self { context }
    }

    /// Resolve placeholders in `text`, layering `task_context` (task-local,
    /// takes precedence) over the workflow-wide context.
    pub fn resolve(&self, text: &str, task_context: &HashMap<String, String>) -> String {
        let merged = self.merged_context(task_context);
        substitute(text, &merged)
    }

    /// Same substitution applied to a search-query string specifically
    /// (kept as a distinct entry point since queries are the most common
    /// placeholder consumer and may later need query-specific escaping).
    pub fn resolve_search_query(&self, query: &str, task_context: &HashMap<String, String>) -> String {
        self.resolve(query, task_context)
    }

    /// Resolve placeholders inside every string value of a parameter map,
    /// recursing into nested objects and arrays. Non-string values pass
    /// through unchanged.
    pub fn resolve_parameters(
        &self,
        parameters: &HashMap<String, serde_json::Value>,
        task_context: &HashMap<String, String>,
    ) -> HashMap<String, serde_json::Value> {
        let merged = self.merged_context(task_context);
        parameters
            .iter()
            .map(|(k, v)| (k.clone(), resolve_value(v, &merged)))
            .collect()
    }

    /// Substitute a single discovery axis's placeholder key (`SOURCETYPE`,
    /// `HOST`, `SOURCE`) with one concrete value, for a per-fan-out task
    /// instance (spec §4.6.2).
    pub fn resolve_for_discovery_value(&self, text: &str, axis: DiscoveryAxis, value: &str) -> String {
        text.replace(&format!("{{{}}}", axis.placeholder_key()), value)
    }

    fn merged_context(&self, task_context: &HashMap<String, String>) -> HashMap<String, String> {
        let mut merged = self.context.workflow.clone();
        merged.extend(task_context.clone());
        for axis in DiscoveryAxis::ALL {
            if let Some(first) = self.context.discovered.values(axis).first() {
                merged
                    .entry(axis.placeholder_key().to_string())
                    .or_insert_with(|| first.clone());
            }
        }
        merged
    }
}

fn substitute(text: &str, context: &HashMap<String, String>) -> String {
    let mut resolved = text.to_string();
    for (key, value) in context {
        resolved = resolved.replace(&format!("{{{key}}}"), value);
    }
    resolved
}

fn resolve_value(value: &serde_json::Value, context: &HashMap<String, String>) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(substitute(s, context)),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(|v| resolve_value(v, context)).collect())
        }
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with(workflow: &[(&str, &str)]) -> RuntimeContext {
        let map = workflow
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeContext::seeded(map)
    }

    #[test]
    fn task_context_overrides_workflow_context() {
        let ctx = context_with(&[("TARGET", "s4c_www")]);
        let resolver = PlaceholderResolver::new(&ctx);
        let mut task_ctx = HashMap::new();
        task_ctx.insert("TARGET".to_string(), "s4c_api".to_string());
        let resolved = resolver.resolve("search index={TARGET}", &task_ctx);
        assert_eq!(resolved, "search index=s4c_api");
    }

    #[test]
    fn unmatched_placeholder_passes_through_unchanged() {
        let ctx = context_with(&[]);
        let resolver = PlaceholderResolver::new(&ctx);
        let resolved = resolver.resolve("search index={UNKNOWN}", &HashMap::new());
        assert_eq!(resolved, "search index={UNKNOWN}");
    }

    #[test]
    fn resolution_is_idempotent_once_stable() {
        let ctx = context_with(&[("TARGET", "s4c_www")]);
        let resolver = PlaceholderResolver::new(&ctx);
        let once = resolver.resolve("search index={TARGET}", &HashMap::new());
        let twice = resolver.resolve(&once, &HashMap::new());
        assert_eq!(once, twice);
    }

    #[test]
    fn resolve_parameters_recurses_into_nested_values() {
        let ctx = context_with(&[("TARGET", "s4c_www")]);
        let resolver = PlaceholderResolver::new(&ctx);
        let mut params = HashMap::new();
        params.insert(
            "filters".to_string(),
            serde_json::json!({"index": "{TARGET}", "limit": 10}),
        );
        let resolved = resolver.resolve_parameters(&params, &HashMap::new());
        assert_eq!(resolved["filters"]["index"], serde_json::json!("s4c_www"));
        assert_eq!(resolved["filters"]["limit"], serde_json::json!(10));
    }

    #[test]
    fn per_fan_out_axis_value_substitutes_uppercase_placeholder() {
        let ctx = context_with(&[]);
        let resolver = PlaceholderResolver::new(&ctx);
        let resolved = resolver.resolve_for_discovery_value(
            "sourcetype={SOURCETYPE}",
            DiscoveryAxis::Sourcetype,
            "access_combined",
        );
        assert_eq!(resolved, "sourcetype=access_combined");
    }

    #[test]
    fn first_discovered_value_seeds_discovery_placeholder_when_absent_from_context() {
        let mut ctx = context_with(&[]);
        ctx.discovered.insert(DiscoveryAxis::Host, "web-01");
        let resolver = PlaceholderResolver::new(&ctx);
        let resolved = resolver.resolve("host={HOST}", &HashMap::new());
        assert_eq!(resolved, "host=web-01");
    }
}
