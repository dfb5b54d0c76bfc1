//! Micro-agent configuration synthesis and bounded parallel fan-out/gather
//! (spec §4.5, §5).

use crate::coordinator::AgentCoordinator;
use gaf_core::{AgentInput, AgentOutput, Capability};
use gaf_template::WorkflowTask;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Tool names the instruction builder recognizes as platform query tools
/// and gives extra usage guidance for.
const PLATFORM_TOOLS: &[&str] = &[
    "run_oneshot_search",
    "run_splunk_search",
    "get_spl_reference",
    "get_splunk_documentation",
];

/// A fully-resolved configuration for one micro-agent invocation: everything
/// a [`Capability::execute`] call needs, synthesized once per task.
#[derive(Debug, Clone)]
pub struct MicroAgentConfig {
    pub task_id: String,
    pub name: String,
    /// The capability this micro-agent is dispatched to, resolved by the
    /// Agent Coordinator at run time (spec §3 Task.tool).
    pub agent_name: String,
    pub instructions: String,
    pub allowed_tools: Vec<String>,
    pub timeout: Duration,
    pub task_metadata: HashMap<String, serde_json::Value>,
}

/// Outcome of one micro-agent run, always produced even on failure or
/// timeout — callers never see a panic or a bare `Err` out of
/// [`MicroAgentBuilder::run_parallel`].
#[derive(Debug, Clone)]
pub struct MicroAgentResult {
    pub task_id: String,
    pub agent_name: String,
    pub success: bool,
    pub output: Option<AgentOutput>,
    pub error: Option<String>,
    pub execution_time: Duration,
    pub timeout_occurred: bool,
}

/// `allowed_tools`: from `llm_loop.allowed_tools` if present, otherwise the
/// union of `{task.tool}`, the validation agent if `validate_syntax`, the
/// synthesis agent if `interpret_results`, and the default query tools if
/// a search query is present (spec §4.5).
fn allowed_tools_for(task: &WorkflowTask) -> Vec<String> {
    if let Some(llm_loop) = &task.llm_loop {
        if !llm_loop.allowed_tools.is_empty() {
            return llm_loop.allowed_tools.clone();
        }
    }

    let mut tools = vec![task.tool.clone()];
    if let Some(validation) = &task.validation {
        if validation.validate_syntax {
            tools.push(validation.agent.clone());
        }
    }
    if let Some(interpretation) = &task.result_interpretation {
        if interpretation.interpret_results {
            tools.push(interpretation.agent.clone());
        }
    }
    if task.search_query.is_some() {
        tools.extend(PLATFORM_TOOLS.iter().map(|t| t.to_string()));
    }
    tools.extend(task.context_resources.iter().map(|r| r.id.clone()));

    let mut seen = std::collections::HashSet::new();
    tools.retain(|t| seen.insert(t.clone()));
    tools
}

pub struct MicroAgentBuilder {
    default_timeout: Duration,
}

impl MicroAgentBuilder {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Build the micro-agent configuration for one task (spec §4.5).
    pub fn build_config(&self, task: &WorkflowTask, phase_context: &HashMap<String, String>) -> MicroAgentConfig {
        let timeout = task
            .timeout_sec
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let mut task_metadata = HashMap::new();
        task_metadata.insert("title".to_string(), serde_json::json!(task.title));
        task_metadata.insert("goal".to_string(), serde_json::json!(task.goal));
        if let Some(query) = &task.search_query {
            task_metadata.insert("search_query".to_string(), serde_json::json!(query));
        }
        if let Some(params) = &task.parameters {
            task_metadata.insert("parameters".to_string(), serde_json::json!(params));
        }
        task_metadata.insert(
            "execution_mode".to_string(),
            serde_json::json!(format!("{:?}", task.execution_mode)),
        );

        MicroAgentConfig {
            task_id: task.task_id.clone(),
            name: format!("MicroAgent_{}", task.task_id),
            agent_name: task.tool.clone(),
            instructions: self.build_instructions(task, phase_context),
            allowed_tools: allowed_tools_for(task),
            timeout,
            task_metadata,
        }
    }

    fn build_instructions(&self, task: &WorkflowTask, phase_context: &HashMap<String, String>) -> String {
        let mut instructions = format!(
            "Task: {}\nGoal: {}\n",
            task.title, task.goal
        );
        if let Some(description) = &task.description {
            instructions.push_str(&format!("Description: {description}\n"));
        }
        if !phase_context.is_empty() {
            instructions.push_str("Context:\n");
            for (k, v) in phase_context {
                instructions.push_str(&format!("  {k} = {v}\n"));
            }
        }
        let platform_tools_used: Vec<&str> = task
            .context_resources
            .iter()
            .map(|r| r.id.as_str())
            .filter(|id| PLATFORM_TOOLS.contains(id))
            .collect();
        if !platform_tools_used.is_empty() {
            instructions.push_str(&format!(
                "You have access to these platform tools: {}. Use them to gather the data this task needs before responding.\n",
                platform_tools_used.join(", ")
            ));
        }
        if let Some(query) = &task.search_query {
            instructions.push_str(&format!(
                "Run the following search and base your answer on its results:\n{query}\n"
            ));
        }
        instructions
    }

    /// Run every config against its own `agent_name`, bounded to
    /// `max_parallel` concurrent invocations in aggregate, each with its own
    /// timeout. Every item produces a [`MicroAgentResult`]; a panic, error,
    /// or timeout in one item never prevents the others from completing
    /// (spec §5). Results are returned in input order (gather).
    pub async fn run_parallel(
        &self,
        configs: Vec<MicroAgentConfig>,
        coordinator: Arc<AgentCoordinator>,
        max_parallel: usize,
    ) -> Vec<MicroAgentResult> {
        let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
        let mut handles = Vec::with_capacity(configs.len());

        for config in configs {
            let semaphore = Arc::clone(&semaphore);
            let coordinator = Arc::clone(&coordinator);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                run_single(coordinator, config).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_error) => results.push(MicroAgentResult {
                    task_id: "unknown".to_string(),
                    agent_name: "unknown".to_string(),
                    success: false,
                    output: None,
                    error: Some(join_error.to_string()),
                    execution_time: Duration::ZERO,
                    timeout_occurred: false,
                }),
            }
        }
        results
    }
}

/// Resolve `names` to their corresponding agent handles; for tools that are
/// subtools of a composite agent, attach the composite's toolset exactly
/// once (spec §4.5 step 1). Names with no registered agent pass through
/// unchanged as a bare tool reference.
async fn resolve_allowed_tools(coordinator: &AgentCoordinator, names: &[String]) -> Vec<String> {
    let mut resolved = Vec::with_capacity(names.len());
    for name in names {
        if let Ok(agent) = coordinator.get_agent(name).await {
            let subtools = agent.tool_set();
            if subtools.is_empty() {
                resolved.push(name.clone());
            } else {
                resolved.extend(subtools);
            }
        } else {
            resolved.push(name.clone());
        }
    }
    let mut seen = std::collections::HashSet::new();
    resolved.retain(|t| seen.insert(t.clone()));
    resolved
}

async fn run_single(coordinator: Arc<AgentCoordinator>, config: MicroAgentConfig) -> MicroAgentResult {
    let started = Instant::now();
    let agent_name = config.agent_name.clone();
    let allowed_tools = resolve_allowed_tools(&coordinator, &config.allowed_tools).await;
    let input = AgentInput::new(config.instructions.clone()).with_allowed_tools(allowed_tools);

    let outcome = tokio::time::timeout(config.timeout, async {
        let agent = coordinator.get_agent(&agent_name).await?;
        agent.execute(input).await
    })
    .await;

    let execution_time = started.elapsed();
    match outcome {
        Ok(Ok(output)) => MicroAgentResult {
            task_id: config.task_id,
            agent_name: config.agent_name,
            success: true,
            output: Some(output),
            error: None,
            execution_time,
            timeout_occurred: false,
        },
        Ok(Err(e)) => MicroAgentResult {
            task_id: config.task_id,
            agent_name: config.agent_name,
            success: false,
            output: None,
            error: Some(e.to_string()),
            execution_time,
            timeout_occurred: false,
        },
        Err(_elapsed) => MicroAgentResult {
            task_id: config.task_id,
            agent_name: config.agent_name,
            success: false,
            output: None,
            error: Some(format!("timed out after {:?}", config.timeout)),
            execution_time,
            timeout_occurred: true,
        },
    }
}
