//! Workflow template discovery: scan directories of template documents,
//! validate each, and group the results (spec §4.2, §10.6).
//!
//! Grounded on the original system's workflow discovery pass: a recursive
//! directory scan skipping obvious example/template files, validating every
//! candidate, and grouping the results several different ways for the
//! caller to query without re-scanning.

use chrono::{DateTime, Utc};
use gaf_core::FieldError;
use gaf_template::{ComplexityLevel, TemplateValidator, WorkflowCategory, WorkflowSource,
    WorkflowStability, WorkflowTemplate, WorkflowType};
use path_clean::PathClean;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Filename substrings (checked against the lowercased file stem) that mark
/// a document as an example or scaffold rather than a real template.
const SKIP_PATTERNS: &[&str] = &[
    "template",
    "example",
    "_template",
    "_example",
    "basic_workflow_template",
    "security_audit_example",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

/// A single discovered template, flattened for cheap grouping/filtering
/// without re-parsing the source document.
#[derive(Debug, Clone)]
pub struct WorkflowInfo {
    pub workflow_id: String,
    pub workflow_name: String,
    pub version: String,
    pub description: String,
    pub workflow_type: WorkflowType,
    pub workflow_category: WorkflowCategory,
    pub source: WorkflowSource,
    pub complexity_level: ComplexityLevel,
    pub stability: WorkflowStability,
    pub business_value: String,
    pub estimated_duration: String,
    pub target_audience: Vec<String>,
    pub use_cases: Vec<String>,
    pub industry_focus: Vec<String>,
    pub file_path: PathBuf,
    pub validation_status: ValidationStatus,
    pub validation_errors: Vec<FieldError>,
    pub discovery_timestamp: DateTime<Utc>,
}

impl WorkflowInfo {
    fn from_template(
        template: &WorkflowTemplate,
        file_path: PathBuf,
        validation_errors: Vec<FieldError>,
        discovery_timestamp: DateTime<Utc>,
    ) -> Self {
        let validation_status = if validation_errors.is_empty() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        };
        Self {
            workflow_id: template.workflow_id.clone(),
            workflow_name: template.workflow_name.clone(),
            version: template.version.clone(),
            description: template.description.clone(),
            workflow_type: template.workflow_type,
            workflow_category: template.workflow_category,
            source: template.source,
            complexity_level: template.complexity_level,
            stability: template.stability,
            business_value: template.business_value.clone(),
            estimated_duration: template.estimated_duration.clone(),
            target_audience: template.target_audience.clone(),
            use_cases: template.use_cases.clone(),
            industry_focus: template.industry_focus.clone(),
            file_path,
            validation_status,
            validation_errors,
            discovery_timestamp,
        }
    }
}

/// A named bucket of discovered workflows plus a few precomputed
/// distributions, used by callers that want a dashboard-style breakdown
/// without recomputing it themselves.
#[derive(Debug, Clone)]
pub struct WorkflowGroup {
    pub group_id: String,
    pub group_name: String,
    pub description: String,
    pub workflows: Vec<WorkflowInfo>,
    pub stability_distribution: HashMap<String, usize>,
    pub complexity_distribution: HashMap<String, usize>,
    pub source_distribution: HashMap<String, usize>,
}

impl WorkflowGroup {
    fn new(group_id: String, group_name: String, description: String, workflows: Vec<WorkflowInfo>) -> Self {
        let mut stability_distribution = HashMap::new();
        let mut complexity_distribution = HashMap::new();
        let mut source_distribution = HashMap::new();
        for w in &workflows {
            *stability_distribution
                .entry(format!("{:?}", w.stability))
                .or_insert(0) += 1;
            *complexity_distribution
                .entry(format!("{:?}", w.complexity_level))
                .or_insert(0) += 1;
            *source_distribution
                .entry(w.source.as_str().to_string())
                .or_insert(0) += 1;
        }
        Self {
            group_id,
            group_name,
            description,
            workflows,
            stability_distribution,
            complexity_distribution,
            source_distribution,
        }
    }

    pub fn total_count(&self) -> usize {
        self.workflows.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscoverySummary {
    pub total_workflows: usize,
    pub total_groups: usize,
    pub workflows_by_source: HashMap<String, usize>,
    pub workflows_by_complexity: HashMap<String, usize>,
    pub workflows_by_stability: HashMap<String, usize>,
    pub group_names: Vec<String>,
}

/// Optional filter criteria for [`WorkflowDiscovery::workflows_by_criteria`].
#[derive(Debug, Clone, Default)]
pub struct DiscoveryCriteria {
    pub source: Option<WorkflowSource>,
    pub complexity: Option<ComplexityLevel>,
    pub workflow_type: Option<WorkflowType>,
    pub category: Option<WorkflowCategory>,
    pub stability: Option<WorkflowStability>,
}

/// Recursive scanner + cache over one or more base directories of template
/// documents.
pub struct WorkflowDiscovery {
    base_paths: Vec<PathBuf>,
    validator: TemplateValidator,
    cache: Option<Vec<WorkflowInfo>>,
}

impl WorkflowDiscovery {
    pub fn new(base_paths: Vec<PathBuf>) -> Self {
        Self {
            base_paths,
            validator: TemplateValidator::new(),
            cache: None,
        }
    }

    /// The conventional `<root>/core/flows` and `<root>/contrib/flows`
    /// layout.
    pub fn with_default_paths(root: &Path) -> Self {
        Self::new(vec![root.join("core/flows"), root.join("contrib/flows")])
    }

    /// Scan all base paths, validating every candidate file. Results are
    /// cached; pass `force_refresh = true` to re-scan.
    pub fn discover_workflows(&mut self, force_refresh: bool) -> &[WorkflowInfo] {
        if force_refresh || self.cache.is_none() {
            let mut discovered = Vec::new();
            for base in &self.base_paths {
                self.scan_directory(base, &mut discovered);
            }
            self.cache = Some(discovered);
        }
        self.cache.as_deref().unwrap_or_default()
    }

    fn scan_directory(&self, dir: &Path, out: &mut Vec<WorkflowInfo>) {
        if !dir.exists() {
            return;
        }
        for entry in WalkDir::new(dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if should_skip_file(path) {
                continue;
            }
            match self.process_workflow_file(path) {
                Some(info) => out.push(info),
                None => {
                    tracing::warn!(path = %path.display(), "discovery could not parse template as JSON");
                }
            }
        }
    }

    fn process_workflow_file(&self, path: &Path) -> Option<WorkflowInfo> {
        let document = std::fs::read_to_string(path).ok()?;
        let cleaned: PathBuf = path.to_path_buf().clean();
        match gaf_template::load_legacy(&document, &cleaned.display().to_string()) {
            Ok((template, warnings)) => Some(WorkflowInfo::from_template(
                &template,
                cleaned,
                warnings,
                discovery_now(),
            )),
            Err(_) => None,
        }
    }

    /// The literal spec §4.2 contract: `workflow_id -> DiscoveredWorkflow`
    /// with invalid files omitted (they are still counted, via
    /// `discovery_summary`/`discover_workflows`, just not returned here).
    pub fn valid_workflows(&self) -> HashMap<String, &WorkflowInfo> {
        self.discovered()
            .iter()
            .filter(|w| w.validation_status == ValidationStatus::Valid)
            .map(|w| (w.workflow_id.clone(), w))
            .collect()
    }

    pub fn workflows_by_criteria(&self, criteria: &DiscoveryCriteria) -> Vec<&WorkflowInfo> {
        self.cache
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|w| criteria.source.map_or(true, |s| s == w.source))
            .filter(|w| criteria.complexity.map_or(true, |c| c == w.complexity_level))
            .filter(|w| criteria.workflow_type.map_or(true, |t| t == w.workflow_type))
            .filter(|w| criteria.category.map_or(true, |c| c == w.workflow_category))
            .filter(|w| criteria.stability.map_or(true, |s| s == w.stability))
            .collect()
    }

    fn discovered(&self) -> &[WorkflowInfo] {
        self.cache.as_deref().unwrap_or_default()
    }

    pub fn group_by_category(&self) -> HashMap<String, WorkflowGroup> {
        self.group_by(|w| format!("{:?}", w.workflow_category), "category")
    }

    pub fn group_by_source(&self) -> HashMap<String, WorkflowGroup> {
        self.group_by(|w| w.source.as_str().to_string(), "source")
    }

    pub fn group_by_complexity(&self) -> HashMap<String, WorkflowGroup> {
        self.group_by(|w| format!("{:?}", w.complexity_level), "complexity")
    }

    pub fn group_by_type(&self) -> HashMap<String, WorkflowGroup> {
        self.group_by(|w| format!("{:?}", w.workflow_type), "type")
    }

    fn group_by(
        &self,
        key_fn: impl Fn(&WorkflowInfo) -> String,
        prefix: &str,
    ) -> HashMap<String, WorkflowGroup> {
        let mut buckets: HashMap<String, Vec<WorkflowInfo>> = HashMap::new();
        for w in self.discovered() {
            buckets.entry(key_fn(w)).or_default().push(w.clone());
        }
        buckets
            .into_iter()
            .map(|(key, workflows)| {
                let group_id = format!("{prefix}_{}", key.to_lowercase());
                let group_name = format!("{prefix}: {key}");
                let description = format!("Workflows grouped by {prefix} = {key}");
                (
                    group_id.clone(),
                    WorkflowGroup::new(group_id, group_name, description, workflows),
                )
            })
            .collect()
    }

    pub fn discovery_summary(&self) -> DiscoverySummary {
        let discovered = self.discovered();
        let mut workflows_by_source = HashMap::new();
        let mut workflows_by_complexity = HashMap::new();
        let mut workflows_by_stability = HashMap::new();
        for w in discovered {
            *workflows_by_source.entry(w.source.as_str().to_string()).or_insert(0) += 1;
            *workflows_by_complexity
                .entry(format!("{:?}", w.complexity_level))
                .or_insert(0) += 1;
            *workflows_by_stability
                .entry(format!("{:?}", w.stability))
                .or_insert(0) += 1;
        }
        let groups = self.group_by_category();
        DiscoverySummary {
            total_workflows: discovered.len(),
            total_groups: groups.len(),
            workflows_by_source,
            workflows_by_complexity,
            workflows_by_stability,
            group_names: groups.into_keys().collect(),
        }
    }
}

fn should_skip_file(path: &Path) -> bool {
    let stem = match path.file_stem().and_then(|s| s.to_str()) {
        Some(s) => s.to_lowercase(),
        None => return true,
    };
    SKIP_PATTERNS.iter().any(|p| stem.contains(p))
}

fn discovery_now() -> DateTime<Utc> {
    Utc::now()
}
