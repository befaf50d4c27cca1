// Workflow transition and operation errors

use super::state::WorkflowStep;
use crate::generation::GenerationError;
use crate::report::ReportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A required field is missing or invalid; the step does not change
    #[error("Validation failed on {step}: {reason}")]
    Validation { step: WorkflowStep, reason: String },

    /// The generation service call failed; the workflow stays on Outputs
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The interpretation is flagged ambiguous; forward progress is denied
    #[error("Interpretation is blocked by ambiguities: {}", format_ambiguities(.ambiguities))]
    AmbiguityBlock { ambiguities: Vec<String> },

    #[error(transparent)]
    Export(#[from] ReportError),

    #[error("Generation in progress")]
    GenerationInProgress,

    #[error("Cannot {action} on step {step}")]
    InvalidTransition {
        step: WorkflowStep,
        action: &'static str,
    },

    /// A generation result arrived for a ticket that is no longer current
    #[error("Generation result does not match the request in flight")]
    StaleGeneration,
}

fn format_ambiguities(ambiguities: &[String]) -> String {
    if ambiguities.is_empty() {
        "(none listed)".to_string()
    } else {
        ambiguities.join("; ")
    }
}

impl WorkflowError {
    pub fn validation(step: WorkflowStep, reason: impl Into<String>) -> Self {
        WorkflowError::Validation {
            step,
            reason: reason.into(),
        }
    }

    /// Whether this error is the ambiguity gate rather than a failure
    pub fn is_ambiguity_block(&self) -> bool {
        matches!(self, WorkflowError::AmbiguityBlock { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = WorkflowError::validation(WorkflowStep::Inputs, "at least one input is required");
        assert_eq!(
            err.to_string(),
            "Validation failed on Inputs: at least one input is required"
        );

        let err = WorkflowError::AmbiguityBlock {
            ambiguities: vec!["unit of speed".to_string(), "alarm latency".to_string()],
        };
        assert!(err.is_ambiguity_block());
        assert_eq!(
            err.to_string(),
            "Interpretation is blocked by ambiguities: unit of speed; alarm latency"
        );

        let err = WorkflowError::InvalidTransition {
            step: WorkflowStep::TestCases,
            action: "export",
        };
        assert_eq!(err.to_string(), "Cannot export on step Test Cases");
    }

    #[test]
    fn test_generation_error_is_transparent() {
        let err: WorkflowError = GenerationError::NoResponse("connection refused".to_string()).into();
        assert_eq!(
            err.to_string(),
            "No response from generation service: connection refused"
        );
    }
}
