//! Built-in, rule-based phase and workflow synthesis (spec §4.6.4, §4.6.5).
//!
//! Runs with no external agent call so synthesis always produces a usable
//! record even when no synthesis agent is registered; an external
//! synthesis agent, when available, replaces this record wholesale and the
//! built-in record is kept alongside it under `builtin_metadata`.

use crate::results::TaskResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Insight {
    pub text: String,
    pub confidence: &'static str,
    pub source_task: String,
}

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub text: String,
    pub priority: &'static str,
    pub category: &'static str,
}

static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[\*\-\u{2022}]\s*(.+)$").unwrap());
static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]+[.!?]").unwrap());
static RECOMMEND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(recommend|suggest|should|consider)\b").unwrap());
static ERROR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)error").unwrap());
static TEMPORAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(time|hour|day)\b").unwrap());
static VOLUME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(volume|count|events)\b").unwrap());
static HIGH_IMPACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(critical|failure|down|error)\b").unwrap());
static MEDIUM_IMPACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(performance|slow|delay)\b").unwrap());
static LOW_EFFORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(dashboard|alert|monitor)\b").unwrap());
static MEDIUM_EFFORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(investigate|analyze|review)\b").unwrap());

pub fn extract_insights(text: &str, source_task: &str) -> Vec<Insight> {
    text.lines()
        .filter_map(|line| BULLET_RE.captures(line))
        .map(|caps| caps[1].trim().to_string())
        .filter(|line| line.len() > 10)
        .map(|text| Insight {
            confidence: if text.to_lowercase().contains("significant") {
                "high"
            } else {
                "medium"
            },
            source_task: source_task.to_string(),
            text,
        })
        .collect()
}

pub fn extract_data_patterns(text: &str) -> Vec<&'static str> {
    let mut tags = Vec::new();
    if ERROR_RE.is_match(text) {
        tags.push("error_patterns");
    }
    if TEMPORAL_RE.is_match(text) {
        tags.push("temporal_patterns");
    }
    if VOLUME_RE.is_match(text) {
        tags.push("volume_patterns");
    }
    tags
}

pub fn extract_recommendations(text: &str) -> Vec<Recommendation> {
    SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|sentence| sentence.len() > 20 && RECOMMEND_RE.is_match(sentence))
        .map(|text| Recommendation {
            priority: if text.to_lowercase().contains("critical") {
                "high"
            } else {
                "medium"
            },
            category: "operational",
            text,
        })
        .collect()
}

fn classify_business_impact(text: &str) -> &'static str {
    if HIGH_IMPACT_RE.is_match(text) {
        "high"
    } else if MEDIUM_IMPACT_RE.is_match(text) {
        "medium"
    } else {
        "low"
    }
}

fn classify_effort(text: &str) -> &'static str {
    if LOW_EFFORT_RE.is_match(text) {
        "low"
    } else if MEDIUM_EFFORT_RE.is_match(text) {
        "medium"
    } else {
        "high"
    }
}

fn relevant_personas(insights: &[Insight], recommendations: &[Recommendation]) -> Vec<&'static str> {
    let mut personas = vec!["operations"];
    let all_text: String = insights
        .iter()
        .map(|i| i.text.as_str())
        .chain(recommendations.iter().map(|r| r.text.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if all_text.contains("security") {
        personas.push("security");
    }
    if all_text.contains("business") || all_text.contains("revenue") || all_text.contains("cost") {
        personas.push("business-analyst");
    }
    personas
}

fn dashboard_and_alert_suggestions(patterns: &[&str]) -> (Vec<String>, Vec<String>) {
    let mut dashboards = Vec::new();
    let mut alerts = Vec::new();
    if patterns.contains(&"error_patterns") {
        alerts.push("Alert on error rate exceeding baseline.".to_string());
    }
    if patterns.contains(&"volume_patterns") {
        dashboards.push("Dashboard panel tracking event volume over time.".to_string());
    }
    if patterns.contains(&"temporal_patterns") {
        dashboards.push("Time-series dashboard for the observed temporal pattern.".to_string());
    }
    (dashboards, alerts)
}

fn generate_executive_summary(insights: &[Insight]) -> Value {
    let high_confidence: Vec<&Insight> = insights.iter().filter(|i| i.confidence == "high").collect();
    let top: Vec<Value> = high_confidence
        .iter()
        .take(5)
        .map(|i| {
            json!({
                "text": i.text,
                "source_task": i.source_task,
                "business_impact": classify_business_impact(&i.text),
            })
        })
        .collect();
    json!({ "top_insights": top })
}

fn generate_business_intelligence(
    recommendations: &[Recommendation],
    insights: &[Insight],
    patterns: &[&str],
) -> Value {
    let high_priority: Vec<&Recommendation> = recommendations.iter().filter(|r| r.priority == "high").collect();
    let top: Vec<Value> = high_priority
        .iter()
        .take(3)
        .map(|r| {
            json!({
                "text": r.text,
                "category": r.category,
                "estimated_effort": classify_effort(&r.text),
                "business_value": classify_business_impact(&r.text),
            })
        })
        .collect();
    let (dashboards, alerts) = dashboard_and_alert_suggestions(patterns);
    json!({
        "top_recommendations": top,
        "relevant_personas": relevant_personas(insights, recommendations),
        "dashboard_recommendations": dashboards,
        "alert_recommendations": alerts,
    })
}

/// The built-in phase-synthesis record (spec §4.6.4, step 3).
pub fn build_phase_synthesis(phase_name: &str, description: &str, tasks: &[TaskResult]) -> Value {
    let mut insights = Vec::new();
    let mut patterns: Vec<&'static str> = Vec::new();
    let mut recommendations = Vec::new();
    let mut has_search_results = false;

    for task in tasks.iter().filter(|t| t.success) {
        let Some(Value::String(text)) = task.data.get("response_text") else {
            continue;
        };
        insights.extend(extract_insights(text, &task.task_id));
        for tag in extract_data_patterns(text) {
            if !patterns.contains(&tag) {
                patterns.push(tag);
            }
        }
        recommendations.extend(extract_recommendations(text));
        if let Some(Value::Array(results)) = task
            .data
            .get("search_results")
            .and_then(|v| v.get("results"))
        {
            has_search_results |= !results.is_empty();
        }
    }

    let has_meaningful_data =
        !insights.is_empty() || !patterns.is_empty() || !recommendations.is_empty() || has_search_results;

    json!({
        "success": true,
        "phase_name": phase_name,
        "synthesis_type": "builtin_parallel_fanout_gather",
        "key_insights": insights.iter().map(|i| json!({
            "text": i.text, "confidence": i.confidence, "source_task": i.source_task,
        })).collect::<Vec<_>>(),
        "discovered_data": patterns,
        "recommendations": recommendations.iter().map(|r| json!({
            "text": r.text, "priority": r.priority, "category": r.category,
        })).collect::<Vec<_>>(),
        "has_meaningful_data": has_meaningful_data,
        "task_count": tasks.len(),
        "successful_task_count": tasks.iter().filter(|t| t.success).count(),
        "executive_summary": generate_executive_summary(&insights),
        "business_intelligence": generate_business_intelligence(&recommendations, &insights, &patterns),
        "synthesis_method": "builtin",
        "description": description,
    })
}

/// Aggregate per-phase synthesis entries into the final workflow-level
/// output (spec §4.6.5).
pub fn build_workflow_synthesis(
    phase_synthesis: &HashMap<String, Value>,
    output_structure: Option<&HashMap<String, Value>>,
) -> Value {
    let mut discovered_data = serde_json::Map::new();
    let mut key_insights = Vec::new();
    let mut recommendations = Vec::new();
    let mut summary_lines = Vec::new();

    let mut phase_names: Vec<&String> = phase_synthesis.keys().collect();
    phase_names.sort();
    for phase_key in phase_names {
        let record = &phase_synthesis[phase_key];
        let phase_name = phase_key.trim_end_matches("_synthesis");
        discovered_data.insert(phase_key.clone(), record.get("discovered_data").cloned().unwrap_or(json!([])));
        if let Some(Value::Array(insights)) = record.get("key_insights") {
            key_insights.extend(insights.clone());
        }
        if let Some(Value::Array(recs)) = record.get("recommendations") {
            recommendations.extend(recs.clone());
        }
        let task_count = record.get("task_count").and_then(Value::as_u64).unwrap_or(0);
        let success_count = record
            .get("successful_task_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        summary_lines.push(format!("{phase_name}: {success_count}/{task_count} tasks succeeded"));
    }

    json!({
        "summary": summary_lines.join("\n"),
        "discovered_data": discovered_data,
        "key_insights": key_insights,
        "recommendations": recommendations,
        "execution_metadata": {
            "phase_count": phase_synthesis.len(),
            "output_structure": output_structure.cloned().unwrap_or_default(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bullet_insights_above_length_threshold() {
        let text = "* This is a significant finding about latency\n- short\nno bullet here";
        let insights = extract_insights(text, "t1");
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].confidence, "high");
    }

    #[test]
    fn extracts_recommendation_sentences_with_keyword_and_length() {
        let text = "We recommend increasing the retention window for these logs. Too short.";
        let recs = extract_recommendations(text);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, "medium");
    }

    #[test]
    fn data_pattern_tags_detect_keyword_presence() {
        let tags = extract_data_patterns("we saw a volume spike at 3am with several error events");
        assert!(tags.contains(&"error_patterns"));
        assert!(tags.contains(&"volume_patterns"));
    }

    #[test]
    fn phase_synthesis_is_meaningful_when_search_results_present_even_without_text_insights() {
        let mut task = TaskResult::success("t1", HashMap::new(), std::time::Duration::ZERO);
        task.data.insert(
            "search_results".to_string(),
            json!({"results": [{"sourcetype": "access_combined"}]}),
        );
        let record = build_phase_synthesis("discovery", "desc", &[task]);
        assert_eq!(record["has_meaningful_data"], json!(true));
    }

    #[test]
    fn workflow_synthesis_aggregates_phase_entries_in_sorted_order() {
        let mut phases = HashMap::new();
        phases.insert(
            "alpha_synthesis".to_string(),
            json!({"task_count": 2, "successful_task_count": 2, "key_insights": [], "recommendations": [], "discovered_data": []}),
        );
        let synthesis = build_workflow_synthesis(&phases, None);
        assert!(synthesis["summary"].as_str().unwrap().contains("alpha"));
    }
}
