//! Cross-cutting properties of `FlowEngine::execute` that a single unit
//! test can't exercise on its own (spec §8).

use async_trait::async_trait;
use gaf_core::{AgentInput, AgentOutput, Capability, ComponentMetadata, EngineConfig, Result};
use gaf_engine::FlowEngine;
use gaf_template::{
    AgentDependency, ComplexityLevel, DataRequirements, ExecutionMode, WorkflowCategory,
    WorkflowPhase, WorkflowSource, WorkflowStability, WorkflowTask, WorkflowTemplate,
    WorkflowType,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

struct CountingAgent {
    metadata: ComponentMetadata,
    in_flight: Arc<AtomicUsize>,
    max_observed: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl Capability for CountingAgent {
    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    async fn execute(&self, input: AgentInput) -> Result<AgentOutput> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_observed.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(AgentOutput::text(format!("handled: {}", input.prompt)))
    }
}

struct OrderRecordingAgent {
    metadata: ComponentMetadata,
    order: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Capability for OrderRecordingAgent {
    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    async fn execute(&self, input: AgentInput) -> Result<AgentOutput> {
        self.order.lock().await.push(input.prompt.clone());
        Ok(AgentOutput::text(format!("handled: {}", input.prompt)))
    }
}

fn task(task_id: &str, tool: &str) -> WorkflowTask {
    WorkflowTask {
        task_id: task_id.to_string(),
        title: task_id.to_string(),
        goal: "run".to_string(),
        tool: tool.to_string(),
        description: None,
        search_query: Some(format!("search index=main {task_id}")),
        parameters: None,
        timeout_sec: Some(5),
        analysis_focus: None,
        mandatory: Some(false),
        parallel: None,
        execution_mode: ExecutionMode::Default,
        validation: None,
        result_interpretation: None,
        llm_loop: None,
        context_resources: Vec::new(),
        dynamic_instructions: None,
    }
}

fn base_template(phases: indexmap::IndexMap<String, WorkflowPhase>) -> WorkflowTemplate {
    let mut agent_dependencies = HashMap::new();
    agent_dependencies.insert(
        "worker".to_string(),
        AgentDependency {
            agent_id: "worker".to_string(),
            description: "runs queries".to_string(),
            required: true,
            capabilities: None,
            integration_points: None,
            tools: None,
        },
    );

    WorkflowTemplate {
        workflow_id: "core.integration_check".to_string(),
        workflow_name: "Integration Check".to_string(),
        version: "1.0.0".to_string(),
        description: "Exercises cross-cutting engine behavior.".to_string(),
        workflow_type: WorkflowType::Monitoring,
        workflow_category: WorkflowCategory::SystemHealth,
        source: WorkflowSource::Core,
        maintainer: "team".to_string(),
        stability: WorkflowStability::Stable,
        complexity_level: ComplexityLevel::Beginner,
        estimated_duration: "2-5 minutes".to_string(),
        target_audience: vec!["ops".to_string()],
        splunk_versions: vec!["8.0+".to_string()],
        last_updated: "2024-01-01".to_string(),
        documentation_url: "./README.md".to_string(),
        prerequisites: vec!["platform_access".to_string()],
        required_permissions: vec!["read".to_string()],
        data_requirements: DataRequirements::default(),
        business_value: "Keeps operators informed.".to_string(),
        use_cases: vec!["daily health check".to_string()],
        success_metrics: vec!["green status".to_string()],
        industry_focus: vec![],
        agent: None,
        workflow_instructions: None,
        agent_dependencies,
        core_phases: phases,
        execution_flow: None,
        output_structure: None,
    }
}

#[tokio::test]
async fn parallel_phase_never_exceeds_max_parallel_concurrent_agents() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_observed = Arc::new(AtomicUsize::new(0));
    let coordinator = Arc::new(gaf_agents::AgentCoordinator::new());
    coordinator
        .register(
            "worker",
            Arc::new(CountingAgent {
                metadata: ComponentMetadata::new("worker", "counts concurrent invocations"),
                in_flight: Arc::clone(&in_flight),
                max_observed: Arc::clone(&max_observed),
                delay: Duration::from_millis(40),
            }),
        )
        .await;

    let phase = WorkflowPhase {
        name: "Fan Out".to_string(),
        description: "runs several tasks at once".to_string(),
        mandatory: true,
        parallel: true,
        max_parallel: Some(2),
        tasks: (0..6).map(|i| task(&format!("t{i}"), "worker")).collect(),
    };
    let mut phases = indexmap::IndexMap::new();
    phases.insert("fanout".to_string(), phase);
    let template = base_template(phases);

    let engine = FlowEngine::new(coordinator, EngineConfig::default());
    let result = engine.execute(&template, HashMap::new()).await;

    assert!(result.success);
    assert_eq!(result.phases[0].tasks.len(), 6);
    assert!(
        max_observed.load(Ordering::SeqCst) <= 2,
        "observed {} concurrent invocations, expected at most 2",
        max_observed.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn phases_execute_in_declared_order_regardless_of_map_iteration() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let coordinator = Arc::new(gaf_agents::AgentCoordinator::new());
    coordinator
        .register(
            "worker",
            Arc::new(OrderRecordingAgent {
                metadata: ComponentMetadata::new("worker", "records invocation order"),
                order: Arc::clone(&order),
            }),
        )
        .await;

    let mut phases = indexmap::IndexMap::new();
    for name in ["third", "first", "second"] {
        let phase = WorkflowPhase {
            name: name.to_string(),
            description: format!("phase {name}"),
            mandatory: true,
            parallel: false,
            max_parallel: None,
            tasks: vec![task(name, "worker")],
        };
        phases.insert(name.to_string(), phase);
    }
    let template = base_template(phases);

    let engine = FlowEngine::new(coordinator, EngineConfig::default());
    let result = engine.execute(&template, HashMap::new()).await;

    assert!(result.success);
    let recorded = result
        .phases
        .iter()
        .map(|p| p.phase_name.clone())
        .collect::<Vec<_>>();
    assert_eq!(recorded, vec!["third", "first", "second"]);
}

/// Stands in for the single platform search agent that services every
/// `run_oneshot_search` task in a workflow: the discover phase's task and
/// the follow-up phase's task both dispatch to this one agent, so its
/// behavior is keyed off call order rather than identity.
struct SharedSearchAgent {
    metadata: ComponentMetadata,
    calls: Arc<AtomicUsize>,
    seen_query: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl Capability for SharedSearchAgent {
    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    async fn execute(&self, input: AgentInput) -> Result<AgentOutput> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            let mut output = AgentOutput::text("found one host");
            output.data.insert(
                "search_results".to_string(),
                serde_json::json!({ "results": [{ "host": "web-07" }] }),
            );
            Ok(output)
        } else {
            *self.seen_query.lock().await = Some(input.prompt.clone());
            Ok(AgentOutput::text("ok"))
        }
    }
}

/// A host discovered while executing an earlier phase must still be
/// available to resolve a later phase's `{HOST}` placeholder (spec §8
/// discovery monotonicity): nothing discovered is lost between phases.
#[tokio::test]
async fn host_discovered_in_one_phase_resolves_a_placeholder_in_the_next() {
    let seen_query = Arc::new(Mutex::new(None));
    let coordinator = Arc::new(gaf_agents::AgentCoordinator::new());
    coordinator
        .register(
            "run_oneshot_search",
            Arc::new(SharedSearchAgent {
                metadata: ComponentMetadata::new("run_oneshot_search", "runs platform searches"),
                calls: Arc::new(AtomicUsize::new(0)),
                seen_query: Arc::clone(&seen_query),
            }),
        )
        .await;

    let discover_phase = WorkflowPhase {
        name: "Discover".to_string(),
        description: "finds hosts".to_string(),
        mandatory: true,
        parallel: false,
        max_parallel: None,
        tasks: vec![task("discover", "run_oneshot_search")],
    };
    let follow_up_phase = WorkflowPhase {
        name: "Follow Up".to_string(),
        description: "queries the discovered host".to_string(),
        mandatory: true,
        parallel: false,
        max_parallel: None,
        tasks: vec![{
            let mut t = task("follow_up", "run_oneshot_search");
            t.search_query = Some("search host={HOST}".to_string());
            t
        }],
    };
    let mut phases = indexmap::IndexMap::new();
    phases.insert("discover".to_string(), discover_phase);
    phases.insert("follow_up".to_string(), follow_up_phase);
    let template = base_template(phases);

    let engine = FlowEngine::new(coordinator, EngineConfig::default());
    let result = engine.execute(&template, HashMap::new()).await;

    assert!(result.success);
    let recorded = seen_query.lock().await.clone();
    assert_eq!(recorded.as_deref(), Some("search host=web-07"));
}

struct SlowAgent {
    metadata: ComponentMetadata,
    delay: Duration,
}

#[async_trait]
impl Capability for SlowAgent {
    fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    async fn execute(&self, _input: AgentInput) -> Result<AgentOutput> {
        tokio::time::sleep(self.delay).await;
        Ok(AgentOutput::text("too slow to matter"))
    }
}

/// A parallel task that outlives its `timeout_sec` must fail with a
/// timeout marker instead of hanging the whole workflow (spec §8 timeout
/// containment), and the rest of the execution must still complete.
#[tokio::test]
async fn parallel_task_past_its_timeout_fails_without_hanging_the_workflow() {
    let coordinator = Arc::new(gaf_agents::AgentCoordinator::new());
    coordinator
        .register(
            "slow",
            Arc::new(SlowAgent {
                metadata: ComponentMetadata::new("slow", "never finishes in time"),
                delay: Duration::from_secs(5),
            }),
        )
        .await;
    coordinator
        .register(
            "worker",
            Arc::new(SlowAgent {
                metadata: ComponentMetadata::new("worker", "finishes promptly"),
                delay: Duration::from_millis(10),
            }),
        )
        .await;

    let mut slow_task = task("slow_task", "slow");
    slow_task.timeout_sec = Some(0);
    slow_task.mandatory = Some(false);
    let fast_task = task("fast_task", "worker");

    let phase = WorkflowPhase {
        name: "Fan Out".to_string(),
        description: "a slow task that times out alongside a fast one".to_string(),
        mandatory: true,
        parallel: true,
        max_parallel: Some(2),
        tasks: vec![slow_task, fast_task],
    };
    let mut phases = indexmap::IndexMap::new();
    phases.insert("fanout".to_string(), phase);
    let template = base_template(phases);

    let engine = FlowEngine::new(coordinator, EngineConfig::default());
    let result = tokio::time::timeout(Duration::from_secs(3), engine.execute(&template, HashMap::new()))
        .await
        .expect("engine.execute must return well before the agent's own delay elapses");

    let slow_result = result.phases[0].tasks.iter().find(|t| t.task_id == "slow_task").unwrap();
    assert!(!slow_result.success);
    assert_eq!(
        slow_result.metadata.get("timeout_occurred"),
        Some(&serde_json::json!(true))
    );

    let fast_result = result.phases[0].tasks.iter().find(|t| t.task_id == "fast_task").unwrap();
    assert!(fast_result.success);
}
