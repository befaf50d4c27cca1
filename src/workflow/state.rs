//! Workflow state
//!
//! Defines the six workflow steps, the requirement form and the state owned
//! by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::selection::SelectionTracker;
use crate::coverage::CoverageDiscrepancy;
use crate::models::{CoverageReport, Interpretation, ParameterSet, TestCase, TraceabilityMatrix};

/// Workflow steps, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    /// Requirement id, text and service credential
    Requirement,
    /// Input parameter definitions
    Inputs,
    /// Output parameter definitions; leaving this step runs generation
    Outputs,
    /// Review of the service's interpretation (ambiguity gate)
    Interpretation,
    /// Generated test cases and selection
    TestCases,
    /// Export artifacts
    Export,
}

impl WorkflowStep {
    /// Get all steps in order
    pub fn all() -> &'static [WorkflowStep] {
        &[
            WorkflowStep::Requirement,
            WorkflowStep::Inputs,
            WorkflowStep::Outputs,
            WorkflowStep::Interpretation,
            WorkflowStep::TestCases,
            WorkflowStep::Export,
        ]
    }

    /// Get the next step, if any
    pub fn next(&self) -> Option<WorkflowStep> {
        match self {
            WorkflowStep::Requirement => Some(WorkflowStep::Inputs),
            WorkflowStep::Inputs => Some(WorkflowStep::Outputs),
            WorkflowStep::Outputs => Some(WorkflowStep::Interpretation),
            WorkflowStep::Interpretation => Some(WorkflowStep::TestCases),
            WorkflowStep::TestCases => Some(WorkflowStep::Export),
            WorkflowStep::Export => None,
        }
    }

    /// Get the previous step, if any
    pub fn previous(&self) -> Option<WorkflowStep> {
        match self {
            WorkflowStep::Requirement => None,
            WorkflowStep::Inputs => Some(WorkflowStep::Requirement),
            WorkflowStep::Outputs => Some(WorkflowStep::Inputs),
            WorkflowStep::Interpretation => Some(WorkflowStep::Outputs),
            WorkflowStep::TestCases => Some(WorkflowStep::Interpretation),
            WorkflowStep::Export => Some(WorkflowStep::TestCases),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WorkflowStep::Requirement => "Requirement",
            WorkflowStep::Inputs => "Inputs",
            WorkflowStep::Outputs => "Outputs",
            WorkflowStep::Interpretation => "Interpretation",
            WorkflowStep::TestCases => "Test Cases",
            WorkflowStep::Export => "Export",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WorkflowStep::Requirement => "Enter the requirement and service credential",
            WorkflowStep::Inputs => "Define the input parameters",
            WorkflowStep::Outputs => "Define the output parameters",
            WorkflowStep::Interpretation => "Review extracted rules and ambiguities",
            WorkflowStep::TestCases => "Review and select generated test cases",
            WorkflowStep::Export => "Export workbooks, coverage and traceability",
        }
    }

    /// Get the step index (0-based)
    pub fn index(&self) -> usize {
        match self {
            WorkflowStep::Requirement => 0,
            WorkflowStep::Inputs => 1,
            WorkflowStep::Outputs => 2,
            WorkflowStep::Interpretation => 3,
            WorkflowStep::TestCases => 4,
            WorkflowStep::Export => 5,
        }
    }
}

impl Default for WorkflowStep {
    fn default() -> Self {
        WorkflowStep::Requirement
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Requirement form entered on the first step
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    pub requirement_id: String,
    pub requirement_text: String,
    /// Never serialized back to callers
    #[serde(default, skip_serializing)]
    pub credential: String,
}

impl std::fmt::Debug for FormData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormData")
            .field("requirement_id", &self.requirement_id)
            .field("requirement_text", &self.requirement_text)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl FormData {
    /// Names of required fields that are still blank
    pub fn missing_items(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.requirement_id.trim().is_empty() {
            missing.push("requirement_id");
        }
        if self.requirement_text.trim().is_empty() {
            missing.push("requirement_text");
        }
        if self.credential.trim().is_empty() {
            missing.push("credential");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_items().is_empty()
    }

    pub fn has_credential(&self) -> bool {
        !self.credential.trim().is_empty()
    }
}

/// Everything one generation call produced.
///
/// Stored or replaced as a unit, so test cases never exist without the
/// interpretation and coverage artifacts that belong to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub interpretation: Interpretation,
    pub test_cases: Vec<TestCase>,
    pub coverage_report: CoverageReport,
    pub traceability_matrix: TraceabilityMatrix,
    /// Soft findings from response validation
    pub warnings: Vec<String>,
    /// Differences between service-supplied and recomputed coverage
    pub discrepancies: Vec<CoverageDiscrepancy>,
    pub generated_at: DateTime<Utc>,
}

impl GenerationOutcome {
    pub fn tc_ids(&self) -> impl Iterator<Item = &str> {
        self.test_cases.iter().map(|tc| tc.tc_id.as_str())
    }
}

/// Complete state of one workflow, owned by its engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub current_step: WorkflowStep,
    pub form: FormData,
    pub parameters: ParameterSet,
    /// Derived data from the last successful generation
    pub outcome: Option<GenerationOutcome>,
    pub selection: SelectionTracker,
    /// Whether a generation call is in flight
    pub generating: bool,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            current_step: WorkflowStep::default(),
            form: FormData::default(),
            parameters: ParameterSet::default(),
            outcome: None,
            selection: SelectionTracker::default(),
            generating: false,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn interpretation(&self) -> Option<&Interpretation> {
        self.outcome.as_ref().map(|o| &o.interpretation)
    }

    pub fn test_cases(&self) -> &[TestCase] {
        self.outcome
            .as_ref()
            .map(|o| o.test_cases.as_slice())
            .unwrap_or(&[])
    }

    pub fn coverage_report(&self) -> Option<&CoverageReport> {
        self.outcome.as_ref().map(|o| &o.coverage_report)
    }

    pub fn traceability_matrix(&self) -> Option<&TraceabilityMatrix> {
        self.outcome.as_ref().map(|o| &o.traceability_matrix)
    }

    /// Selected test cases in the order they were produced
    pub fn selected_test_cases(&self) -> Vec<&TestCase> {
        self.test_cases()
            .iter()
            .filter(|tc| self.selection.is_selected(&tc.tc_id))
            .collect()
    }

    pub fn set_error(&mut self, error: String) {
        self.last_error = Some(error);
        self.updated_at = Utc::now();
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
        self.updated_at = Utc::now();
    }

    /// Progress through the steps (0-100)
    pub fn completion_percentage(&self) -> u8 {
        let total = WorkflowStep::all().len() - 1;
        ((self.current_step.index() as f32 / total as f32) * 100.0) as u8
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}
