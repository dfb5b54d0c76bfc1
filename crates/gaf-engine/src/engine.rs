//! Top-level workflow executor (spec §4.6).

use crate::harvest;
use crate::results::{
    FlowExecutionResult, LLMStepResult, NullProgressSink, PhaseResult, ProgressEvent, ProgressSink,
    ProgressStatus, TaskResult,
};
use crate::synthesis::{build_phase_synthesis, build_workflow_synthesis};
use gaf_agents::{AgentCoordinator, MicroAgentBuilder};
use gaf_core::{DiscoveryAxis, EngineConfig, RuntimeContext};
use gaf_resolver::PlaceholderResolver;
use gaf_template::{ExecutionMode, TemplateValidator, WorkflowPhase, WorkflowTask, WorkflowTemplate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The agent name the engine asks to synthesize phase results, matching the
/// name declared by templates that opt into external synthesis.
const SYNTHESIS_AGENT: &str = "result_synthesizer";

/// Tools that run a platform query directly (spec §4.6.2 step 5). A task
/// naming any other tool gets the generic success payload instead of a
/// coordinator dispatch, even if it carries a `search_query`.
const QUERY_EXECUTION_TOOLS: &[&str] = &["run_oneshot_search", "run_splunk_search"];

fn is_query_execution_tool(tool: &str) -> bool {
    QUERY_EXECUTION_TOOLS.contains(&tool)
}

static PARAMETER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)index[=\s]+([a-zA-Z0-9_\-]+)").unwrap());

pub struct FlowEngine {
    coordinator: Arc<AgentCoordinator>,
    micro_agent_builder: MicroAgentBuilder,
    config: EngineConfig,
    validator: TemplateValidator,
}

impl FlowEngine {
    pub fn new(coordinator: Arc<AgentCoordinator>, config: EngineConfig) -> Self {
        let micro_agent_builder = MicroAgentBuilder::new(Duration::from_secs(config.micro_agent_timeout_secs));
        Self {
            coordinator,
            micro_agent_builder,
            config,
            validator: TemplateValidator::new(),
        }
    }

    pub fn coordinator(&self) -> &Arc<AgentCoordinator> {
        &self.coordinator
    }

    /// Extract a `TARGET` context override from a free-text request, per
    /// the Dynamic Agent Factory's parameter-extraction contract (spec
    /// §4.7). Kept here since it is the engine's own context shape that the
    /// extracted value feeds into.
    pub fn extract_target_override(request: &str) -> Option<(String, String)> {
        PARAMETER_RE
            .captures(request)
            .map(|caps| ("TARGET".to_string(), caps[1].to_string()))
    }

    pub async fn execute(&self, template: &WorkflowTemplate, context: HashMap<String, String>) -> FlowExecutionResult {
        self.execute_with_progress(template, context, &NullProgressSink).await
    }

    pub async fn execute_with_progress(
        &self,
        template: &WorkflowTemplate,
        context: HashMap<String, String>,
        progress: &dyn ProgressSink,
    ) -> FlowExecutionResult {
        let started = Instant::now();

        if let Err(validation_error) = self.validator.validate_template(template, &template.workflow_id) {
            return FlowExecutionResult {
                workflow_name: template.workflow_name.clone(),
                success: false,
                phases: Vec::new(),
                synthesized_output: serde_json::Value::Null,
                total_execution_time: started.elapsed(),
                error_summary: Some(validation_error.to_string()),
            };
        }

        let mut runtime_context = RuntimeContext::seeded(context);
        let mut phase_results = Vec::with_capacity(template.core_phases.len());
        let mut workflow_failed = false;

        for (phase_name, phase) in &template.core_phases {
            emit(progress, ProgressEvent::phase(phase_name.as_str(), ProgressStatus::Starting, "phase starting"));
            let phase_started = Instant::now();

            let task_results = self.execute_phase(phase_name, phase, &runtime_context, progress).await;
            harvest::harvest(&task_results, &mut runtime_context.discovered);

            let mandatory_failed = task_results
                .iter()
                .zip(phase.tasks.iter())
                .any(|(result, task)| !result.success && task.mandatory.unwrap_or(true));
            let phase_success = !mandatory_failed;

            let synthesis = build_phase_synthesis(phase_name, &phase.description, &task_results);
            let synthesis = self.maybe_external_synthesis(phase_name, &phase.description, synthesis).await;
            runtime_context.record_phase_synthesis(phase_name, synthesis);

            phase_results.push(PhaseResult {
                phase_name: phase_name.clone(),
                success: phase_success,
                tasks: task_results,
                execution_time: phase_started.elapsed(),
            });

            emit(
                progress,
                ProgressEvent::phase(phase_name.as_str(), ProgressStatus::Completed, "phase completed"),
            );

            if !phase_success && phase.mandatory {
                workflow_failed = true;
                break;
            }
        }

        let synthesized_output = build_workflow_synthesis(
            &runtime_context.phase_synthesis,
            template.output_structure.as_ref(),
        );

        let error_summary = workflow_failed.then(|| {
            phase_results
                .iter()
                .filter(|p| !p.success)
                .map(|p| format!("phase '{}' failed", p.phase_name))
                .collect::<Vec<_>>()
                .join("; ")
        });

        FlowExecutionResult {
            workflow_name: template.workflow_name.clone(),
            success: !workflow_failed,
            phases: phase_results,
            synthesized_output,
            total_execution_time: started.elapsed(),
            error_summary,
        }
    }

    async fn maybe_external_synthesis(
        &self,
        phase_name: &str,
        description: &str,
        builtin: serde_json::Value,
    ) -> serde_json::Value {
        if builtin.get("has_meaningful_data") != Some(&json!(true)) {
            return builtin;
        }
        let context_description = format!("Phase: {phase_name} — {description}");
        match self
            .coordinator
            .synthesize_results(SYNTHESIS_AGENT, &[gaf_core::AgentOutput::text(builtin.to_string())], Some(context_description.as_str()))
            .await
        {
            Ok(output) => json!({
                "success": true,
                "phase_name": phase_name,
                "synthesis_type": "external",
                "synthesis_method": "hybrid",
                "result": output.text,
                "builtin_metadata": builtin,
            }),
            Err(_) => builtin,
        }
    }

    async fn execute_phase(
        &self,
        phase_name: &str,
        phase: &WorkflowPhase,
        runtime_context: &RuntimeContext,
        progress: &dyn ProgressSink,
    ) -> Vec<TaskResult> {
        let (per_fan_out, regular): (Vec<&WorkflowTask>, Vec<&WorkflowTask>) = phase
            .tasks
            .iter()
            .partition(|t| t.execution_mode == ExecutionMode::PerFanOut);

        let mut results = if phase.parallel && regular.len() > 1 {
            self.execute_tasks_parallel(phase_name, phase, &regular, runtime_context, progress).await
        } else {
            let mut out = Vec::with_capacity(regular.len());
            for task in &regular {
                emit(
                    progress,
                    ProgressEvent::task(phase_name, task.task_id.as_str(), ProgressStatus::Starting, "task starting"),
                );
                let result = self.execute_task(task, runtime_context).await;
                emit(
                    progress,
                    ProgressEvent::task(
                        phase_name,
                        task.task_id.as_str(),
                        if result.success { ProgressStatus::Completed } else { ProgressStatus::Error },
                        if result.success { "task completed" } else { "task failed" },
                    ),
                );
                out.push(result);
            }
            out
        };

        for task in &per_fan_out {
            results.push(self.execute_per_fan_out_task(task, runtime_context).await);
        }

        results
    }

    async fn execute_tasks_parallel(
        &self,
        phase_name: &str,
        phase: &WorkflowPhase,
        tasks: &[&WorkflowTask],
        runtime_context: &RuntimeContext,
        progress: &dyn ProgressSink,
    ) -> Vec<TaskResult> {
        let resolver = PlaceholderResolver::new(runtime_context);
        let configs = tasks
            .iter()
            .map(|t| {
                emit(
                    progress,
                    ProgressEvent::task(phase_name, t.task_id.as_str(), ProgressStatus::Starting, "task starting"),
                );
                let mut config = self.micro_agent_builder.build_config(t, &runtime_context.workflow);
                config.instructions = resolver.resolve(&config.instructions, &HashMap::new());
                config
            })
            .collect();
        let max_parallel = phase.max_parallel.map(|n| n as usize).unwrap_or(self.config.max_parallel_default);
        let micro_results = self
            .micro_agent_builder
            .run_parallel(configs, Arc::clone(&self.coordinator), max_parallel)
            .await;

        micro_results
            .into_iter()
            .map(|r| {
                emit(
                    progress,
                    ProgressEvent::task(
                        phase_name,
                        r.task_id.as_str(),
                        if r.success { ProgressStatus::Completed } else { ProgressStatus::Error },
                        if r.success { "task completed" } else { "task failed" },
                    ),
                );
                let mut data = HashMap::new();
                if let Some(output) = &r.output {
                    data.insert("response_text".to_string(), json!(output.text));
                    for (k, v) in &output.data {
                        data.insert(k.clone(), v.clone());
                    }
                }
                let mut result = if r.success {
                    TaskResult::success(r.task_id, data, r.execution_time)
                } else {
                    TaskResult::failure(r.task_id, r.error.unwrap_or_default(), r.execution_time)
                };
                result = result
                    .with_metadata("execution_type", json!("parallel_micro_agent"))
                    .with_metadata("timeout_occurred", json!(r.timeout_occurred));
                result
            })
            .collect()
    }

    async fn execute_task(&self, task: &WorkflowTask, runtime_context: &RuntimeContext) -> TaskResult {
        let started = Instant::now();

        if let Some(llm_loop) = &task.llm_loop {
            if llm_loop.enabled {
                return self.execute_llm_loop_task(task, runtime_context, started).await;
            }
        }

        let resolver = PlaceholderResolver::new(runtime_context);
        let mut query = task
            .search_query
            .as_deref()
            .map(|q| resolver.resolve_search_query(q, &HashMap::new()));
        let parameters = task
            .parameters
            .as_ref()
            .map(|p| resolver.resolve_parameters(p, &HashMap::new()))
            .unwrap_or_default();

        if let Some(validation) = &task.validation {
            if validation.validate_syntax {
                if let Some(original_query) = query.clone() {
                    match self
                        .coordinator
                        .validate_search(&validation.agent, &original_query, validation.criteria.as_deref().unwrap_or_default())
                        .await
                    {
                        Ok(output) => {
                            if validation.optimize_performance {
                                if let Some(optimized) = output.data.get("optimized_query").and_then(|v| v.as_str()) {
                                    query = Some(optimized.to_string());
                                }
                            }
                        }
                        Err(e) => return TaskResult::failure(task.task_id.as_str(), e.to_string(), started.elapsed()),
                    }
                }
            }
        }

        let mut data = HashMap::new();
        if let Some(query) = &query {
            data.insert("resolved_query".to_string(), json!(query));
        }

        let runs_as_query = query.as_deref().is_some_and(|q| !q.is_empty()) && is_query_execution_tool(&task.tool);
        if runs_as_query {
            match self
                .coordinator
                .execute_search(&task.tool, query.as_deref().unwrap(), &parameters)
                .await
            {
                Ok(output) => {
                    data.insert("response_text".to_string(), json!(output.text));
                    for (k, v) in output.data {
                        data.insert(k, v);
                    }
                }
                Err(e) => return TaskResult::failure(task.task_id.as_str(), e.to_string(), started.elapsed()),
            }
        } else {
            data.insert("response_text".to_string(), json!(format!("{} completed", task.title)));
        }

        if let Some(interpretation) = &task.result_interpretation {
            if interpretation.interpret_results {
                let prior = gaf_core::AgentOutput::text(
                    data.get("response_text").and_then(|v| v.as_str()).unwrap_or_default(),
                );
                if let Ok(interp) = self
                    .coordinator
                    .synthesize_results(&interpretation.agent, &[prior], interpretation.prompt.as_deref())
                    .await
                {
                    data.insert("interpretation".to_string(), json!(interp.text));
                }
            }
        }

        TaskResult::success(task.task_id.as_str(), data, started.elapsed())
    }

    async fn execute_per_fan_out_task(&self, task: &WorkflowTask, runtime_context: &RuntimeContext) -> TaskResult {
        let started = Instant::now();
        let axis = fan_out_axis(task);
        let values = runtime_context.discovered.values(axis);
        if values.is_empty() {
            return TaskResult::success(task.task_id.as_str(), HashMap::new(), started.elapsed())
                .with_metadata("execution_mode", json!("per-fan-out"))
                .with_metadata("awaiting_discovery", json!(true));
        }

        let resolver = PlaceholderResolver::new(runtime_context);
        let mut iterations = Vec::new();
        for value in values {
            let query = task
                .search_query
                .as_deref()
                .map(|q| resolver.resolve_for_discovery_value(q, axis, value))
                .unwrap_or_default();
            match self.coordinator.execute_search(&task.tool, &query, &HashMap::new()).await {
                Ok(output) => iterations.push(json!({ "value": value, "results": output.text })),
                Err(e) => iterations.push(json!({ "value": value, "error": e.to_string() })),
            }
        }

        let mut data = HashMap::new();
        data.insert("per_fan_out_results".to_string(), json!(iterations));
        TaskResult::success(task.task_id.as_str(), data, started.elapsed())
            .with_metadata("execution_mode", json!("per-fan-out"))
    }

    async fn execute_llm_loop_task(
        &self,
        task: &WorkflowTask,
        runtime_context: &RuntimeContext,
        started: Instant,
    ) -> TaskResult {
        let llm_loop = task.llm_loop.as_ref().expect("checked by caller");
        let resources = self.coordinator.order_context_resources(&task.context_resources);
        let context_loaded: Vec<String> = resources.iter().map(|r| r.id.clone()).collect();

        let resolver = PlaceholderResolver::new(runtime_context);
        let base_prompt = llm_loop
            .prompt
            .as_deref()
            .map(|p| resolver.resolve(p, &HashMap::new()))
            .unwrap_or_else(|| format!("Execute the task: {}", task.title));

        let mut steps = Vec::new();
        for step_number in 1..=llm_loop.max_iterations {
            let input = gaf_core::AgentInput::new(base_prompt.clone())
                .with_allowed_tools(llm_loop.allowed_tools.clone());
            let outcome = self.coordinator.get_agent(&task.tool).await;
            let (tool_output, reasoning, next_action, step_complete) = match outcome {
                Ok(agent) => match agent.execute(input).await {
                    Ok(output) => (Some(json!(output.text)), output.text, "continue".to_string(), false),
                    Err(e) => (None, e.to_string(), "error".to_string(), true),
                },
                Err(e) => (None, e.to_string(), "error".to_string(), true),
            };
            let complete = step_complete || next_action == "complete" || step_number == llm_loop.max_iterations;
            steps.push(LLMStepResult {
                step_number,
                tool_used: Some(task.tool.clone()),
                tool_output,
                llm_reasoning: reasoning,
                next_action,
                step_complete: complete,
                context_loaded: context_loaded.clone(),
            });
            if complete {
                break;
            }
        }

        let mut result = TaskResult::success(task.task_id.as_str(), HashMap::new(), started.elapsed());
        result.llm_steps = steps.clone();
        result
            .with_metadata("llm_loop_enabled", json!(true))
            .with_metadata("steps_executed", json!(steps.len()))
            .with_metadata("context_resources_loaded", json!(context_loaded.len()))
    }
}

fn emit(progress: &dyn ProgressSink, event: ProgressEvent) {
    progress.on_event(event);
}

/// Pick the discovery axis a per-fan-out task iterates over by checking
/// which axis placeholder its search query references; falls back to
/// sourcetype, the most common fan-out key in these templates (spec
/// §4.6.1 names the relevant discovery set only by example).
fn fan_out_axis(task: &WorkflowTask) -> DiscoveryAxis {
    let query = task.search_query.as_deref().unwrap_or_default();
    DiscoveryAxis::ALL
        .into_iter()
        .find(|axis| query.contains(&format!("{{{}}}", axis.placeholder_key())))
        .unwrap_or(DiscoveryAxis::Sourcetype)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gaf_core::{AgentInput, AgentOutput, Capability, ComponentMetadata, Result};
    use gaf_template::{
        AgentDependency, ComplexityLevel, DataRequirements, WorkflowCategory, WorkflowSource,
        WorkflowStability, WorkflowType,
    };
    use indexmap::IndexMap;

    struct EchoAgent {
        metadata: ComponentMetadata,
    }

    #[async_trait]
    impl Capability for EchoAgent {
        fn metadata(&self) -> &ComponentMetadata {
            &self.metadata
        }

        async fn execute(&self, input: AgentInput) -> Result<AgentOutput> {
            Ok(AgentOutput::text(format!(
                "* This is a significant insight from {}",
                input.prompt
            )))
        }
    }

    fn minimal_template(parallel: bool) -> WorkflowTemplate {
        let task = WorkflowTask {
            task_id: "t1".to_string(),
            title: "Check".to_string(),
            goal: "Verify health".to_string(),
            tool: "run_oneshot_search".to_string(),
            description: None,
            search_query: Some("search index={TARGET}".to_string()),
            parameters: None,
            timeout_sec: Some(5),
            analysis_focus: None,
            mandatory: Some(true),
            parallel: None,
            execution_mode: ExecutionMode::Default,
            validation: None,
            result_interpretation: None,
            llm_loop: None,
            context_resources: Vec::new(),
            dynamic_instructions: None,
        };
        let phase = WorkflowPhase {
            name: "Main".to_string(),
            description: "Run the check".to_string(),
            mandatory: true,
            parallel,
            max_parallel: if parallel { Some(2) } else { None },
            tasks: vec![task],
        };
        let mut core_phases = IndexMap::new();
        core_phases.insert("main".to_string(), phase);
        let mut agent_dependencies = HashMap::new();
        agent_dependencies.insert(
            "run_oneshot_search".to_string(),
            AgentDependency {
                agent_id: "run_oneshot_search".to_string(),
                description: "runs queries".to_string(),
                required: true,
                capabilities: None,
                integration_points: None,
                tools: None,
            },
        );

        WorkflowTemplate {
            workflow_id: "core.health_check".to_string(),
            workflow_name: "Health Check".to_string(),
            version: "1.0.0".to_string(),
            description: "desc".to_string(),
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
            core_phases,
            execution_flow: None,
            output_structure: None,
        }
    }

    #[tokio::test]
    async fn sequential_execution_resolves_placeholders_and_succeeds() {
        let coordinator = Arc::new(AgentCoordinator::new());
        coordinator
            .register(
                "run_oneshot_search",
                Arc::new(EchoAgent {
                    metadata: ComponentMetadata::new("run_oneshot_search", "echo"),
                }),
            )
            .await;
        let engine = FlowEngine::new(coordinator, EngineConfig::default());
        let mut context = HashMap::new();
        context.insert("TARGET".to_string(), "s4c_www".to_string());

        let result = engine.execute(&minimal_template(false), context).await;
        assert!(result.success);
        assert_eq!(result.phases.len(), 1);
        assert!(result.phases[0].tasks[0]
            .data
            .get("response_text")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("s4c_www"));
    }

    #[tokio::test]
    async fn parallel_phase_runs_through_micro_agent_and_tags_metadata() {
        let coordinator = Arc::new(AgentCoordinator::new());
        coordinator
            .register(
                "run_oneshot_search",
                Arc::new(EchoAgent {
                    metadata: ComponentMetadata::new("run_oneshot_search", "echo"),
                }),
            )
            .await;
        let engine = FlowEngine::new(coordinator, EngineConfig::default());
        let mut template = minimal_template(true);
        // A parallel phase needs >1 task to take the fan-out path.
        let mut second = template.core_phases["main"].tasks[0].clone();
        second.task_id = "t2".to_string();
        template.core_phases.get_mut("main").unwrap().tasks.push(second);

        let result = engine.execute(&template, HashMap::new()).await;
        assert!(result.success);
        let task = &result.phases[0].tasks[0];
        assert_eq!(task.metadata["execution_type"], json!("parallel_micro_agent"));
    }

    #[tokio::test]
    async fn per_fan_out_task_with_empty_discovery_set_awaits_discovery() {
        let coordinator = Arc::new(AgentCoordinator::new());
        let engine = FlowEngine::new(coordinator, EngineConfig::default());
        let mut template = minimal_template(false);
        let task = &mut template.core_phases.get_mut("main").unwrap().tasks[0];
        task.execution_mode = ExecutionMode::PerFanOut;
        task.search_query = Some("search sourcetype={SOURCETYPE}".to_string());
        task.mandatory = Some(false);

        let result = engine.execute(&template, HashMap::new()).await;
        let task_result = &result.phases[0].tasks[0];
        assert!(task_result.success);
        assert_eq!(task_result.metadata["execution_mode"], json!("per-fan-out"));
        assert_eq!(task_result.metadata["awaiting_discovery"], json!(true));
    }

    #[tokio::test]
    async fn mandatory_task_failure_fails_the_workflow() {
        let coordinator = Arc::new(AgentCoordinator::new());
        let engine = FlowEngine::new(coordinator, EngineConfig::default());
        let result = engine.execute(&minimal_template(false), HashMap::new()).await;
        assert!(!result.success);
        assert!(result.error_summary.is_some());
    }

    struct RewritingValidator {
        metadata: ComponentMetadata,
    }

    #[async_trait]
    impl Capability for RewritingValidator {
        fn metadata(&self) -> &ComponentMetadata {
            &self.metadata
        }

        async fn execute(&self, _input: AgentInput) -> Result<AgentOutput> {
            let mut output = AgentOutput::text("rewritten for performance");
            output.data.insert("optimized_query".to_string(), json!("optimized_q"));
            Ok(output)
        }
    }

    struct RecordingExecutor {
        seen_query: Arc<tokio::sync::Mutex<Option<String>>>,
        metadata: ComponentMetadata,
    }

    #[async_trait]
    impl Capability for RecordingExecutor {
        fn metadata(&self) -> &ComponentMetadata {
            &self.metadata
        }

        async fn execute(&self, input: AgentInput) -> Result<AgentOutput> {
            *self.seen_query.lock().await = Some(input.prompt.clone());
            Ok(AgentOutput::text("ok"))
        }
    }

    #[tokio::test]
    async fn validator_rewrite_is_executed_and_recorded_as_resolved_query() {
        let seen_query = Arc::new(tokio::sync::Mutex::new(None));
        let coordinator = Arc::new(AgentCoordinator::new());
        coordinator
            .register(
                "validator",
                Arc::new(RewritingValidator {
                    metadata: ComponentMetadata::new("validator", "rewrites queries"),
                }),
            )
            .await;
        coordinator
            .register(
                "run_oneshot_search",
                Arc::new(RecordingExecutor {
                    seen_query: Arc::clone(&seen_query),
                    metadata: ComponentMetadata::new("run_oneshot_search", "runs platform searches"),
                }),
            )
            .await;

        let engine = FlowEngine::new(coordinator, EngineConfig::default());
        let mut template = minimal_template(false);
        template.agent_dependencies.insert(
            "validator".to_string(),
            AgentDependency {
                agent_id: "validator".to_string(),
                description: "rewrites queries".to_string(),
                required: true,
                capabilities: None,
                integration_points: None,
                tools: None,
            },
        );
        let task = &mut template.core_phases.get_mut("main").unwrap().tasks[0];
        task.validation = Some(gaf_template::TaskValidation {
            agent: "validator".to_string(),
            criteria: None,
            validate_syntax: true,
            optimize_performance: true,
            per_fan_out_validation: false,
        });

        let result = engine.execute(&template, HashMap::new()).await;
        assert!(result.success);
        let task_result = &result.phases[0].tasks[0];
        assert_eq!(task_result.data.get("resolved_query"), Some(&json!("optimized_q")));
        assert_eq!(seen_query.lock().await.as_deref(), Some("optimized_q"));
    }

    #[tokio::test]
    async fn structurally_invalid_template_short_circuits_before_any_phase_runs() {
        let coordinator = Arc::new(AgentCoordinator::new());
        let engine = FlowEngine::new(coordinator, EngineConfig::default());
        let mut template = minimal_template(false);
        template.version = "not-a-version".to_string();

        let result = engine.execute(&template, HashMap::new()).await;
        assert!(!result.success);
        assert!(result.phases.is_empty());
        assert!(result.error_summary.unwrap().contains("version"));
    }

    #[test]
    fn extract_target_override_reads_index_parameter() {
        let (key, value) = FlowEngine::extract_target_override("please check index=s4c_www for errors").unwrap();
        assert_eq!(key, "TARGET");
        assert_eq!(value, "s4c_www");
    }
}
