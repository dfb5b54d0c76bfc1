//! Structural and cross-field validation of parsed workflow templates
//! (spec §4.1), built as a rule-object pipeline the way the teacher's own
//! agent-template validator composes its rule set.

use crate::model::WorkflowTemplate;
use gaf_core::{FieldError, WorkflowValidationError};
use once_cell::sync::Lazy;
use regex::Regex;

static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap());
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+-\d+\s+(minutes?|hours?)$").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// One independent structural or cross-field check over a parsed template.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, template: &WorkflowTemplate) -> Vec<FieldError>;
}

struct VersionFormatRule;
impl ValidationRule for VersionFormatRule {
    fn name(&self) -> &'static str {
        "version_format"
    }
    fn check(&self, template: &WorkflowTemplate) -> Vec<FieldError> {
        if VERSION_RE.is_match(&template.version) {
            Vec::new()
        } else {
            vec![FieldError::new(
                "version",
                "must be a semantic version matching ^\\d+\\.\\d+\\.\\d+$",
            )]
        }
    }
}

struct EstimatedDurationFormatRule;
impl ValidationRule for EstimatedDurationFormatRule {
    fn name(&self) -> &'static str {
        "estimated_duration_format"
    }
    fn check(&self, template: &WorkflowTemplate) -> Vec<FieldError> {
        if DURATION_RE.is_match(&template.estimated_duration) {
            Vec::new()
        } else {
            vec![FieldError::new(
                "estimated_duration",
                "must match 'N-M minutes' or 'N-M hours'",
            )]
        }
    }
}

struct LastUpdatedFormatRule;
impl ValidationRule for LastUpdatedFormatRule {
    fn name(&self) -> &'static str {
        "last_updated_format"
    }
    fn check(&self, template: &WorkflowTemplate) -> Vec<FieldError> {
        if DATE_RE.is_match(&template.last_updated) {
            Vec::new()
        } else {
            vec![FieldError::new("last_updated", "must be YYYY-MM-DD")]
        }
    }
}

struct DocumentationUrlRule;
impl ValidationRule for DocumentationUrlRule {
    fn name(&self) -> &'static str {
        "documentation_url_format"
    }
    fn check(&self, template: &WorkflowTemplate) -> Vec<FieldError> {
        let url = &template.documentation_url;
        if url.starts_with("./") || url.starts_with("http://") || url.starts_with("https://") {
            Vec::new()
        } else {
            vec![FieldError::new(
                "documentation_url",
                "must be a relative path (./README.md) or absolute URL",
            )]
        }
    }
}

struct BusinessValueLengthRule;
impl ValidationRule for BusinessValueLengthRule {
    fn name(&self) -> &'static str {
        "business_value_length"
    }
    fn check(&self, template: &WorkflowTemplate) -> Vec<FieldError> {
        if template.business_value.len() >= 10 {
            Vec::new()
        } else {
            vec![FieldError::new(
                "business_value",
                "must be at least 10 characters",
            )]
        }
    }
}

struct NonEmptyCollectionsRule;
impl ValidationRule for NonEmptyCollectionsRule {
    fn name(&self) -> &'static str {
        "non_empty_collections"
    }
    fn check(&self, template: &WorkflowTemplate) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if template.target_audience.is_empty() {
            errors.push(FieldError::new("target_audience", "must be non-empty"));
        }
        if template.splunk_versions.is_empty() {
            errors.push(FieldError::new("splunk_versions", "must be non-empty"));
        }
        if template.prerequisites.is_empty() {
            errors.push(FieldError::new("prerequisites", "must be non-empty"));
        }
        if template.required_permissions.is_empty() {
            errors.push(FieldError::new(
                "required_permissions",
                "must be non-empty",
            ));
        }
        if template.use_cases.is_empty() {
            errors.push(FieldError::new("use_cases", "must be non-empty"));
        }
        if template.success_metrics.is_empty() {
            errors.push(FieldError::new("success_metrics", "must be non-empty"));
        }
        if template.agent_dependencies.is_empty() {
            errors.push(FieldError::new("agent_dependencies", "must be non-empty"));
        }
        if template.core_phases.is_empty() {
            errors.push(FieldError::new("core_phases", "must contain at least one phase"));
        }
        for (phase_name, phase) in &template.core_phases {
            if phase.tasks.is_empty() {
                errors.push(FieldError::new(
                    format!("core_phases.{phase_name}.tasks"),
                    "must contain at least one task",
                ));
            }
            if let Some(max_parallel) = phase.max_parallel {
                if max_parallel > 1 && !phase.parallel {
                    errors.push(FieldError::new(
                        format!("core_phases.{phase_name}.max_parallel"),
                        "max_parallel > 1 can only be set when parallel = true",
                    ));
                }
            }
        }
        errors
    }
}

/// `workflow_id` must be `<source>.<slug>` and the `source` half must equal
/// the `source` field (spec §3 WorkflowTemplate invariant).
struct WorkflowIdSourceRule;
impl ValidationRule for WorkflowIdSourceRule {
    fn name(&self) -> &'static str {
        "workflow_id_source_match"
    }
    fn check(&self, template: &WorkflowTemplate) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let parts: Vec<&str> = template.workflow_id.splitn(2, '.').collect();
        match parts.as_slice() {
            [source, slug] if !source.is_empty() && !slug.is_empty() => {
                if *source != "core" && *source != "contrib" {
                    errors.push(FieldError::new(
                        "workflow_id",
                        "source prefix must be 'core' or 'contrib'",
                    ));
                } else if *source != template.source.as_str() {
                    errors.push(FieldError::new(
                        "workflow_id",
                        format!(
                            "workflow_id source '{source}' must match source field '{}'",
                            template.source.as_str()
                        ),
                    ));
                }
            }
            _ => errors.push(FieldError::new(
                "workflow_id",
                "must be in format 'source.name' (e.g. 'core.health_check')",
            )),
        }
        errors
    }
}

/// Every agent referenced by a task's validation/interpretation contract
/// must appear in `agent_dependencies` (spec §3, §8 validation closure).
struct AgentDependencyReferenceRule;
impl ValidationRule for AgentDependencyReferenceRule {
    fn name(&self) -> &'static str {
        "agent_dependency_references"
    }
    fn check(&self, template: &WorkflowTemplate) -> Vec<FieldError> {
        let mut missing = Vec::new();
        for (phase_name, phase) in &template.core_phases {
            for task in &phase.tasks {
                if let Some(validation) = &task.validation {
                    if !template.agent_dependencies.contains_key(&validation.agent) {
                        missing.push(FieldError::new(
                            format!("core_phases.{phase_name}.tasks.{}.validation.agent", task.task_id),
                            format!(
                                "referenced agent '{}' not in agent_dependencies",
                                validation.agent
                            ),
                        ));
                    }
                }
                if let Some(interp) = &task.result_interpretation {
                    if !template.agent_dependencies.contains_key(&interp.agent) {
                        missing.push(FieldError::new(
                            format!(
                                "core_phases.{phase_name}.tasks.{}.result_interpretation.agent",
                                task.task_id
                            ),
                            format!(
                                "referenced agent '{}' not in agent_dependencies",
                                interp.agent
                            ),
                        ));
                    }
                }
            }
        }
        missing
    }
}

pub struct TemplateValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl TemplateValidator {
    /// The default rule set applied by `validate`/discovery.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(WorkflowIdSourceRule),
                Box::new(VersionFormatRule),
                Box::new(EstimatedDurationFormatRule),
                Box::new(LastUpdatedFormatRule),
                Box::new(DocumentationUrlRule),
                Box::new(BusinessValueLengthRule),
                Box::new(NonEmptyCollectionsRule),
                Box::new(AgentDependencyReferenceRule),
            ],
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    fn run(&self, template: &WorkflowTemplate) -> Vec<FieldError> {
        self.rules.iter().flat_map(|rule| rule.check(template)).collect()
    }

    /// Validate an already-parsed template's structure without re-parsing
    /// it from text, for callers (e.g. the Flow Engine) that hold a
    /// `WorkflowTemplate` obtained some other way than `validate`.
    pub fn validate_template(
        &self,
        template: &WorkflowTemplate,
        source_path: &str,
    ) -> Result<(), WorkflowValidationError> {
        let errors = self.run(template);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WorkflowValidationError::new(source_path, errors))
        }
    }

    /// Parse and validate a template document (§4.1 contract).
    ///
    /// `source_path` is used only for error reporting. Accepts JSON or YAML
    /// by best-effort sniffing: a document starting with `{` is parsed as
    /// JSON, everything else as YAML.
    pub fn validate(
        &self,
        document: &str,
        source_path: &str,
    ) -> Result<WorkflowTemplate, WorkflowValidationError> {
        let template = parse_document(document).map_err(|msg| {
            WorkflowValidationError::single(source_path, "root", msg)
        })?;
        let errors = self.run(&template);
        if errors.is_empty() {
            Ok(template)
        } else {
            Err(WorkflowValidationError::new(source_path, errors))
        }
    }
}

impl Default for TemplateValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_document(document: &str) -> Result<WorkflowTemplate, String> {
    let trimmed = document.trim_start();
    if trimmed.starts_with('{') {
        serde_json::from_str(document).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(document).map_err(|e| e.to_string())
    }
}

/// Legacy loading path (§4.1 "Legacy-vs-strict policy"): parse structurally
/// and return the template even if cross-field validation fails, alongside
/// the list of warnings a caller may choose to log.
pub fn load_legacy(document: &str, source_path: &str) -> Result<(WorkflowTemplate, Vec<gaf_core::FieldError>), String> {
    let template = parse_document(document)?;
    let warnings = TemplateValidator::new().run(&template);
    let _ = source_path;
    Ok((template, warnings))
}
