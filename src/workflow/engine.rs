//! Step-gated workflow engine
//!
//! The engine is the single owner of a [`WorkflowState`]. Every mutation goes
//! through one of its operations, and every operation checks the current step
//! first. Generation is split into [`WorkflowEngine::begin_generation`] and
//! [`WorkflowEngine::complete_generation`] so a caller holding the engine
//! behind a lock can release it while the service call is awaited.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::selection::SelectionTracker;
use super::state::{GenerationOutcome, WorkflowState, WorkflowStep};
use crate::coverage;
use crate::generation::{
    validate_response, GenerationClient, GenerationError, GenerationRequest, GenerationResponse,
};
use crate::models::{Parameter, TestCase};
use crate::report::{self, RawExport, Workbook};

/// Whose coverage artifacts are stored when the service supplies them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoveragePolicy {
    /// Always store the local recomputation
    #[default]
    Recompute,
    /// Store the service's report and matrix when both are present
    TrustService,
}

impl CoveragePolicy {
    pub fn from_trust_flag(trust_service: bool) -> Self {
        if trust_service {
            CoveragePolicy::TrustService
        } else {
            CoveragePolicy::Recompute
        }
    }
}

/// Which test cases a workbook export covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    #[default]
    All,
    Selected,
}

/// Partial update of the requirement form; `None` keeps the current value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementUpdate {
    pub requirement_id: Option<String>,
    pub requirement_text: Option<String>,
    #[serde(alias = "apiKey")]
    pub credential: Option<String>,
}

/// Handle for one in-flight generation call
#[derive(Debug)]
pub struct GenerationTicket {
    id: u64,
    request: GenerationRequest,
}

impl GenerationTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    state: WorkflowState,
    policy: CoveragePolicy,
    in_flight: Option<u64>,
    next_ticket: u64,
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new(CoveragePolicy::default())
    }
}

impl WorkflowEngine {
    pub fn new(policy: CoveragePolicy) -> Self {
        Self {
            state: WorkflowState::new(),
            policy,
            in_flight: None,
            next_ticket: 1,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Owned copy of the state for callers outside the engine
    pub fn snapshot(&self) -> WorkflowState {
        self.state.clone()
    }

    pub fn current_step(&self) -> WorkflowStep {
        self.state.current_step
    }

    pub fn policy(&self) -> CoveragePolicy {
        self.policy
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.is_some()
    }

    // Form and parameter edits

    pub fn update_requirement(&mut self, update: RequirementUpdate) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::Requirement, "edit the requirement")?;

        let form = &mut self.state.form;
        if let Some(id) = update.requirement_id {
            form.requirement_id = id;
        }
        if let Some(text) = update.requirement_text {
            form.requirement_text = text;
        }
        if let Some(credential) = update.credential {
            form.credential = credential;
        }
        self.state.updated_at = Utc::now();
        Ok(())
    }

    /// Add an input parameter, returning its index
    pub fn add_input(&mut self, parameter: Parameter) -> Result<usize, WorkflowError> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::Inputs, "add an input")?;
        let checked = check_parameter(&parameter, &self.state.parameters.inputs, WorkflowStep::Inputs);
        if let Err(e) = checked {
            return Err(self.fail(e));
        }
        self.state.parameters.inputs.push(parameter);
        self.state.updated_at = Utc::now();
        Ok(self.state.parameters.inputs.len() - 1)
    }

    pub fn remove_input(&mut self, index: usize) -> Result<Parameter, WorkflowError> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::Inputs, "remove an input")?;
        if index >= self.state.parameters.inputs.len() {
            return Err(self.fail(no_parameter_at(WorkflowStep::Inputs, index)));
        }
        self.state.updated_at = Utc::now();
        Ok(self.state.parameters.inputs.remove(index))
    }

    /// Add an output parameter, returning its index
    pub fn add_output(&mut self, parameter: Parameter) -> Result<usize, WorkflowError> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::Outputs, "add an output")?;
        let checked = check_parameter(&parameter, &self.state.parameters.outputs, WorkflowStep::Outputs);
        if let Err(e) = checked {
            return Err(self.fail(e));
        }
        self.state.parameters.outputs.push(parameter);
        self.state.updated_at = Utc::now();
        Ok(self.state.parameters.outputs.len() - 1)
    }

    pub fn remove_output(&mut self, index: usize) -> Result<Parameter, WorkflowError> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::Outputs, "remove an output")?;
        if index >= self.state.parameters.outputs.len() {
            return Err(self.fail(no_parameter_at(WorkflowStep::Outputs, index)));
        }
        self.state.updated_at = Utc::now();
        Ok(self.state.parameters.outputs.remove(index))
    }

    // Transitions

    /// Move forward one step.
    ///
    /// Leaving `Outputs` requires a generation call and is done through
    /// [`Self::generate`] or the ticket pair instead.
    pub fn advance(&mut self) -> Result<WorkflowStep, WorkflowError> {
        self.ensure_idle()?;
        let from = self.state.current_step;

        let result = match from {
            WorkflowStep::Requirement => {
                let missing = self.state.form.missing_items();
                if missing.is_empty() {
                    Ok(WorkflowStep::Inputs)
                } else {
                    Err(WorkflowError::validation(
                        from,
                        format!("missing {}", missing.join(", ")),
                    ))
                }
            }
            WorkflowStep::Inputs => {
                if self.state.parameters.inputs.is_empty() {
                    Err(WorkflowError::validation(
                        from,
                        "at least one input parameter is required",
                    ))
                } else {
                    Ok(WorkflowStep::Outputs)
                }
            }
            WorkflowStep::Outputs => Err(WorkflowError::InvalidTransition {
                step: from,
                action: "advance without generating",
            }),
            WorkflowStep::Interpretation => match self.state.interpretation() {
                None => Err(WorkflowError::InvalidTransition {
                    step: from,
                    action: "advance without an interpretation",
                }),
                Some(interpretation) if interpretation.is_blocked() => {
                    Err(WorkflowError::AmbiguityBlock {
                        ambiguities: interpretation.ambiguities.clone(),
                    })
                }
                Some(_) => Ok(WorkflowStep::TestCases),
            },
            WorkflowStep::TestCases => Ok(WorkflowStep::Export),
            WorkflowStep::Export => Err(WorkflowError::InvalidTransition {
                step: from,
                action: "advance",
            }),
        };

        let to = self.record(result)?;
        self.move_to(to);
        Ok(to)
    }

    /// Move back one step, keeping everything already entered
    pub fn go_back(&mut self) -> Result<WorkflowStep, WorkflowError> {
        self.ensure_idle()?;
        let from = self.state.current_step;
        let result = from.previous().ok_or(WorkflowError::InvalidTransition {
            step: from,
            action: "go back",
        });
        let to = self.record(result)?;
        self.move_to(to);
        Ok(to)
    }

    /// Return to `Requirement` with the form, parameters and derived data cleared.
    ///
    /// Accepted while a generation is in flight: the outstanding ticket
    /// becomes stale and its result is discarded.
    pub fn reset(&mut self) -> Result<(), WorkflowError> {
        if let Some(id) = self.in_flight.take() {
            log::warn!("Reset discards in-flight generation ticket {}", id);
        }
        log::info!(
            "Resetting workflow from step {}",
            self.state.current_step.display_name()
        );
        self.state = WorkflowState::new();
        Ok(())
    }

    // Generation

    /// Start the `Outputs -> Interpretation` transition.
    ///
    /// Until the returned ticket is completed or abandoned, every other
    /// mutating operation except [`Self::reset`] fails with
    /// [`WorkflowError::GenerationInProgress`].
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, WorkflowError> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::Outputs, "generate")?;
        let step = self.state.current_step;

        if self.state.parameters.outputs.is_empty() {
            return Err(self.fail(WorkflowError::validation(
                step,
                "at least one output parameter is required",
            )));
        }

        let form = &self.state.form;
        let request = GenerationRequest {
            requirement_id: form.requirement_id.clone(),
            requirement_text: form.requirement_text.clone(),
            inputs: self.state.parameters.inputs.clone(),
            outputs: self.state.parameters.outputs.clone(),
            credential: form.credential.clone(),
        };
        if let Err(e) = request.check() {
            return Err(self.fail(e.into()));
        }

        let id = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(id);
        self.state.generating = true;
        self.state.updated_at = Utc::now();

        log::info!(
            "Generation started for {} ({} inputs, {} outputs)",
            request.requirement_id,
            request.inputs.len(),
            request.outputs.len()
        );

        Ok(GenerationTicket { id, request })
    }

    /// Finish a generation started with [`Self::begin_generation`].
    ///
    /// On success the interpretation, test cases and coverage artifacts are
    /// stored together and the workflow moves to `Interpretation`. On failure
    /// nothing derived changes and the workflow stays on `Outputs`.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<GenerationResponse, GenerationError>,
    ) -> Result<WorkflowStep, WorkflowError> {
        if self.in_flight != Some(ticket.id) {
            log::warn!("Ignoring result for generation ticket {}", ticket.id);
            return Err(WorkflowError::StaleGeneration);
        }
        self.in_flight = None;
        self.state.generating = false;

        let requirement_id = ticket.request.requirement_id;
        let outcome = result.and_then(|response| self.build_outcome(&requirement_id, response));
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Generation failed for {}: {}", requirement_id, e);
                return Err(self.fail(e.into()));
            }
        };

        log::info!(
            "Generation finished for {}: status {}, {} rules, {} test cases, {:.1}% coverage",
            requirement_id,
            outcome.interpretation.status.as_str(),
            outcome.interpretation.rules.len(),
            outcome.test_cases.len(),
            outcome.coverage_report.coverage_percentage
        );

        self.state.selection = SelectionTracker::all_of(outcome.tc_ids());
        self.state.outcome = Some(outcome);
        self.move_to(WorkflowStep::Interpretation);
        Ok(WorkflowStep::Interpretation)
    }

    /// Release the flight held by `ticket` without a result.
    ///
    /// The workflow stays on `Outputs` with its derived data untouched.
    /// Returns false when the ticket was already stale.
    pub fn abandon_generation(&mut self, ticket: GenerationTicket) -> bool {
        if self.in_flight != Some(ticket.id) {
            return false;
        }
        self.in_flight = None;
        self.state.generating = false;
        log::warn!(
            "Generation abandoned for {}",
            ticket.request.requirement_id
        );
        self.state.set_error("Generation was abandoned before it completed".to_string());
        true
    }

    /// Run the `Outputs -> Interpretation` transition against `client`
    pub async fn generate<C: GenerationClient>(
        &mut self,
        client: &C,
    ) -> Result<WorkflowStep, WorkflowError> {
        let ticket = self.begin_generation()?;
        let result = client.generate(ticket.request()).await;
        self.complete_generation(ticket, result)
    }

    fn build_outcome(
        &self,
        requirement_id: &str,
        response: GenerationResponse,
    ) -> Result<GenerationOutcome, GenerationError> {
        let validation = validate_response(&response, requirement_id, &self.state.parameters)?;

        let GenerationResponse {
            interpretation,
            test_cases,
            coverage_report,
            traceability_matrix,
            ..
        } = response;

        let computed = coverage::compute(requirement_id, &interpretation.rules, &test_cases);
        let discrepancies = coverage::reconcile(
            &computed,
            coverage_report.as_ref(),
            traceability_matrix.as_ref(),
        );
        for discrepancy in &discrepancies {
            log::warn!("Coverage discrepancy for {}: {}", requirement_id, discrepancy);
        }

        let (coverage_report, traceability_matrix) =
            match (self.policy, coverage_report, traceability_matrix) {
                (CoveragePolicy::TrustService, Some(report), Some(matrix)) => (report, matrix),
                _ => (computed.report, computed.matrix),
            };

        Ok(GenerationOutcome {
            interpretation,
            test_cases,
            coverage_report,
            traceability_matrix,
            warnings: validation.warnings,
            discrepancies,
            generated_at: Utc::now(),
        })
    }

    // Selection

    /// Toggle one test case, returning whether it is now selected
    pub fn toggle_test_case(&mut self, tc_id: &str) -> Result<bool, WorkflowError> {
        self.ensure_idle()?;
        self.ensure_selection_step("toggle a test case")?;
        let step = self.state.current_step;

        let outcome = self.state.outcome.as_ref();
        let known = outcome.into_iter().flat_map(|o| o.tc_ids());
        let Some(selected) = self.state.selection.toggle(tc_id, known) else {
            return Err(self.fail(WorkflowError::validation(
                step,
                format!("unknown test case '{}'", tc_id),
            )));
        };
        self.state.updated_at = Utc::now();
        Ok(selected)
    }

    /// Select everything, or clear the selection when everything is selected.
    /// Returns the number of selected test cases.
    pub fn toggle_all_test_cases(&mut self) -> Result<usize, WorkflowError> {
        self.ensure_idle()?;
        self.ensure_selection_step("toggle all test cases")?;

        let outcome = self.state.outcome.as_ref();
        let known = outcome.into_iter().flat_map(|o| o.tc_ids());
        self.state.selection.toggle_all(known);
        self.state.updated_at = Utc::now();
        Ok(self.state.selection.len())
    }

    pub fn selected_test_cases(&self) -> Vec<&TestCase> {
        self.state.selected_test_cases()
    }

    // Export

    /// Build the test case workbook for all or only the selected test cases
    pub fn export_test_cases(&mut self, scope: ExportScope) -> Result<Workbook, WorkflowError> {
        self.ensure_step(WorkflowStep::Export, "export test cases")?;
        let test_cases = self.state.test_cases();
        let result = match scope {
            ExportScope::All => report::build_test_case_workbook(test_cases),
            ExportScope::Selected => {
                report::build_selected_workbook(test_cases, self.state.selection.selected())
            }
        };
        self.record(result.map_err(WorkflowError::from))
    }

    /// Build the coverage summary and traceability workbook
    pub fn export_coverage(&mut self) -> Result<Workbook, WorkflowError> {
        self.ensure_step(WorkflowStep::Export, "export coverage")?;
        let result = match &self.state.outcome {
            Some(outcome) => Ok(report::build_coverage_workbook(
                &outcome.coverage_report,
                &outcome.traceability_matrix,
            )),
            None => Err(report::ReportError::NothingToExport.into()),
        };
        self.record(result)
    }

    /// Build the raw `{test_cases, coverage_report, traceability_matrix}` export
    pub fn raw_export(&mut self) -> Result<RawExport, WorkflowError> {
        self.ensure_step(WorkflowStep::Export, "export raw data")?;
        let result = match &self.state.outcome {
            Some(outcome) => Ok(RawExport::new(
                outcome.test_cases.clone(),
                outcome.coverage_report.clone(),
                outcome.traceability_matrix.clone(),
            )),
            None => Err(report::ReportError::NothingToExport.into()),
        };
        self.record(result)
    }

    // Helpers

    fn ensure_idle(&self) -> Result<(), WorkflowError> {
        if self.in_flight.is_some() {
            log::warn!("Rejected operation: generation in progress");
            return Err(WorkflowError::GenerationInProgress);
        }
        Ok(())
    }

    fn ensure_step(&mut self, step: WorkflowStep, action: &'static str) -> Result<(), WorkflowError> {
        if self.state.current_step != step {
            let current = self.state.current_step;
            return Err(self.fail(WorkflowError::InvalidTransition {
                step: current,
                action,
            }));
        }
        Ok(())
    }

    fn ensure_selection_step(&mut self, action: &'static str) -> Result<(), WorkflowError> {
        match self.state.current_step {
            WorkflowStep::TestCases | WorkflowStep::Export => Ok(()),
            step => Err(self.fail(WorkflowError::InvalidTransition { step, action })),
        }
    }

    fn move_to(&mut self, to: WorkflowStep) {
        let from = self.state.current_step;
        self.state.current_step = to;
        self.state.clear_error();
        log::info!(
            "Workflow step {} -> {}",
            from.display_name(),
            to.display_name()
        );
    }

    /// Record a failed operation as the last error and hand it back
    fn fail(&mut self, error: WorkflowError) -> WorkflowError {
        log::warn!(
            "Rejected on step {}: {}",
            self.state.current_step.display_name(),
            error
        );
        self.state.set_error(error.to_string());
        error
    }

    fn record<T>(&mut self, result: Result<T, WorkflowError>) -> Result<T, WorkflowError> {
        result.map_err(|e| self.fail(e))
    }
}

fn check_parameter(
    parameter: &Parameter,
    existing: &[Parameter],
    step: WorkflowStep,
) -> Result<(), WorkflowError> {
    parameter
        .validate()
        .map_err(|reason| WorkflowError::validation(step, reason))?;
    let name = parameter.name.trim();
    if existing.iter().any(|p| p.name.trim() == name) {
        return Err(WorkflowError::validation(
            step,
            format!("parameter '{}' is already defined", name),
        ));
    }
    Ok(())
}

fn no_parameter_at(step: WorkflowStep, index: usize) -> WorkflowError {
    WorkflowError::validation(step, format!("no parameter at index {}", index))
}
