//! Error types shared by every Guided Agent Flow Engine crate.

use thiserror::Error;

/// Comprehensive error enum for library-level failures that callers branch on.
///
/// Task- and agent-level failures are *not* represented here: per the engine's
/// containment policy, those are recorded as data (`TaskResult::error`,
/// `PhaseResult`, `FlowExecutionResult::error_summary`) rather than propagated
/// as `Result::Err`. This enum covers failures that occur before a workflow
/// can even be attempted: malformed templates, missing configuration, and
/// internal invariant violations.
#[derive(Debug, Error)]
pub enum GafError {
    #[error("template error: {message}")]
    Template {
        message: String,
        field: Option<String>,
    },

    #[error("agent '{name}' is not registered")]
    AgentUnavailable { name: String },

    #[error("query validation failed via agent '{agent}': {message}")]
    QueryValidation { agent: String, message: String },

    #[error("query execution failed: {message}")]
    QueryExecution { message: String },

    #[error("discovery error: {message}")]
    Discovery { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Convenience Result alias for library-level operations.
pub type Result<T> = std::result::Result<T, GafError>;

/// A single field-level validation failure, `(field_path, message)`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    pub loc: String,
    pub msg: String,
}

impl FieldError {
    pub fn new(loc: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            msg: msg.into(),
        }
    }
}

/// Raised when a workflow template document fails validation.
///
/// Carries the source path (for error reporting) and the full list of field
/// errors, matching the taxonomy's `(loc, msg)` pair shape.
#[derive(Debug)]
pub struct WorkflowValidationError {
    pub template_path: String,
    pub errors: Vec<FieldError>,
}

impl std::error::Error for WorkflowValidationError {}

impl WorkflowValidationError {
    pub fn new(template_path: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            template_path: template_path.into(),
            errors,
        }
    }

    pub fn single(template_path: impl Into<String>, loc: &str, msg: impl Into<String>) -> Self {
        Self::new(template_path, vec![FieldError::new(loc, msg)])
    }
}

impl std::fmt::Display for WorkflowValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "validation failed for workflow '{}':", self.template_path)?;
        for err in &self.errors {
            writeln!(f, "  {}: {}", err.loc, err.msg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_validation_error_display_lists_every_field() {
        let err = WorkflowValidationError::new(
            "core/flows/health_check.json",
            vec![
                FieldError::new("version", "must match ^\\d+\\.\\d+\\.\\d+$"),
                FieldError::new("core_phases", "must contain at least one phase"),
            ],
        );
        let rendered = err.to_string();
        assert!(rendered.contains("core/flows/health_check.json"));
        assert!(rendered.contains("version"));
        assert!(rendered.contains("core_phases"));
    }

    #[test]
    fn agent_unavailable_error_names_the_agent() {
        let err = GafError::AgentUnavailable {
            name: "result_synthesizer".to_string(),
        };
        assert!(err.to_string().contains("result_synthesizer"));
    }
}
