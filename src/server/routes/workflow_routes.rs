//! Workflow command routing
//!
//! Routes for the test case generation workflow:
//! - Workflow lifecycle (create, get, list, delete)
//! - Requirement and parameter edits
//! - Step management (advance, go_back, reset)
//! - Generation of the interpretation and test cases
//! - Test case selection

use crate::generation::GenerationClient;
use crate::models::Parameter;
use crate::workflow::{RequirementUpdate, WorkflowEngine, WorkflowState, WorkflowStep};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{get_arg, get_opt_arg, route_sync, route_unit, with_workflow, ServerAppState};

const WORKFLOW_COMMANDS: &[&str] = &[
    "create_workflow",
    "get_workflow",
    "list_workflows",
    "delete_workflow",
    "update_requirement",
    "add_input",
    "remove_input",
    "add_output",
    "remove_output",
    "advance_step",
    "go_back",
    "reset_workflow",
    "generate_interpretation",
    "toggle_test_case",
    "toggle_all_test_cases",
];

pub fn is_workflow_command(cmd: &str) -> bool {
    WORKFLOW_COMMANDS.contains(&cmd)
}

/// Listing entry for one workflow session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInfo {
    pub id: String,
    pub requirement_id: String,
    pub current_step: WorkflowStep,
    pub generating: bool,
    pub updated_at: DateTime<Utc>,
}

/// A workflow session as returned to callers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowView {
    pub id: String,
    pub has_credential: bool,
    pub completion_percentage: u8,
    #[serde(flatten)]
    pub state: WorkflowState,
}

impl WorkflowView {
    fn of(id: &str, engine: &WorkflowEngine) -> Self {
        let state = engine.snapshot();
        Self {
            id: id.to_string(),
            has_credential: state.form.has_credential(),
            completion_percentage: state.completion_percentage(),
            state,
        }
    }
}

/// Route workflow commands
pub async fn route_workflow_command(
    cmd: &str,
    args: Value,
    state: &ServerAppState,
) -> Result<Value, String> {
    match cmd {
        // =====================================================================
        // Workflow Lifecycle
        // =====================================================================
        "create_workflow" => {
            let mut engine = WorkflowEngine::new(state.coverage_policy());
            if let Some(credential) = state.default_credential.clone() {
                engine
                    .update_requirement(RequirementUpdate {
                        credential: Some(credential),
                        ..Default::default()
                    })
                    .map_err(|e| e.to_string())?;
            }

            let id = Uuid::new_v4().to_string();
            let view = WorkflowView::of(&id, &engine);
            state.lock_workflows()?.insert(id.clone(), engine);
            log::info!("Created workflow {}", id);
            route_sync!(Ok::<_, String>(view))
        }

        "get_workflow" => {
            let id: String = get_arg(&args, "workflowId")?;
            route_sync!(with_workflow(state, &id, |engine| Ok(WorkflowView::of(&id, engine))))
        }

        "list_workflows" => {
            let workflows = state.lock_workflows()?;
            let mut infos: Vec<WorkflowInfo> = workflows
                .iter()
                .map(|(id, engine)| {
                    let s = engine.state();
                    WorkflowInfo {
                        id: id.clone(),
                        requirement_id: s.form.requirement_id.clone(),
                        current_step: s.current_step,
                        generating: engine.is_generating(),
                        updated_at: s.updated_at,
                    }
                })
                .collect();
            infos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            route_sync!(Ok::<_, String>(infos))
        }

        "delete_workflow" => {
            let id: String = get_arg(&args, "workflowId")?;
            let removed = state.lock_workflows()?.remove(&id);
            match removed {
                Some(_) => {
                    log::info!("Deleted workflow {}", id);
                    route_unit!(Ok::<_, String>(()))
                }
                None => Err(format!("Workflow not found: {}", id)),
            }
        }

        // =====================================================================
        // Requirement and Parameter Edits
        // =====================================================================
        "update_requirement" => {
            let id: String = get_arg(&args, "workflowId")?;
            let update = RequirementUpdate {
                requirement_id: get_opt_arg(&args, "requirementId")?,
                requirement_text: get_opt_arg(&args, "requirementText")?,
                credential: get_opt_arg(&args, "credential")?,
            };
            route_sync!(with_workflow(state, &id, |engine| {
                engine.update_requirement(update)?;
                Ok(WorkflowView::of(&id, engine))
            }))
        }

        "add_input" | "add_output" => {
            let id: String = get_arg(&args, "workflowId")?;
            let parameter: Parameter = get_arg(&args, "parameter")?;
            route_sync!(with_workflow(state, &id, |engine| {
                if cmd == "add_input" {
                    engine.add_input(parameter)?;
                } else {
                    engine.add_output(parameter)?;
                }
                Ok(WorkflowView::of(&id, engine))
            }))
        }

        "remove_input" | "remove_output" => {
            let id: String = get_arg(&args, "workflowId")?;
            let index: usize = get_arg(&args, "index")?;
            route_sync!(with_workflow(state, &id, |engine| {
                if cmd == "remove_input" {
                    engine.remove_input(index)?;
                } else {
                    engine.remove_output(index)?;
                }
                Ok(WorkflowView::of(&id, engine))
            }))
        }

        // =====================================================================
        // Step Management
        // =====================================================================
        "advance_step" => {
            let id: String = get_arg(&args, "workflowId")?;
            route_sync!(with_workflow(state, &id, |engine| {
                engine.advance()?;
                Ok(WorkflowView::of(&id, engine))
            }))
        }

        "go_back" => {
            let id: String = get_arg(&args, "workflowId")?;
            route_sync!(with_workflow(state, &id, |engine| {
                engine.go_back()?;
                Ok(WorkflowView::of(&id, engine))
            }))
        }

        "reset_workflow" => {
            let id: String = get_arg(&args, "workflowId")?;
            let confirmed: bool = get_opt_arg(&args, "confirm")?.unwrap_or(false);
            if !confirmed {
                return Err(
                    "Reset discards all entered and generated data; pass confirm: true".to_string(),
                );
            }
            route_sync!(with_workflow(state, &id, |engine| {
                engine.reset()?;
                Ok(WorkflowView::of(&id, engine))
            }))
        }

        // =====================================================================
        // Generation
        // =====================================================================
        "generate_interpretation" => {
            let id: String = get_arg(&args, "workflowId")?;

            // The lock is taken only to begin and to complete the ticket. The
            // call and its completion run in their own task so a dropped
            // request still releases the flight.
            let ticket = with_workflow(state, &id, |engine| engine.begin_generation())?;
            let task_state = state.clone();
            let task_id = id.clone();
            let task = tokio::spawn(async move {
                let result = task_state.client.generate(ticket.request()).await;
                with_workflow(&task_state, &task_id, |engine| {
                    engine.complete_generation(ticket, result)?;
                    Ok(WorkflowView::of(&task_id, engine))
                })
            });
            let view = task.await.map_err(|e| {
                log::error!("Generation task for workflow {} failed: {}", id, e);
                format!("Generation task failed: {}", e)
            })?;
            route_sync!(view)
        }

        // =====================================================================
        // Selection
        // =====================================================================
        "toggle_test_case" => {
            let id: String = get_arg(&args, "workflowId")?;
            let tc_id: String = get_arg(&args, "tcId")?;
            route_sync!(with_workflow(state, &id, |engine| {
                let selected = engine.toggle_test_case(&tc_id)?;
                Ok(json!({ "tcId": tc_id, "selected": selected }))
            }))
        }

        "toggle_all_test_cases" => {
            let id: String = get_arg(&args, "workflowId")?;
            route_sync!(with_workflow(state, &id, |engine| {
                let count = engine.toggle_all_test_cases()?;
                Ok(json!({ "selectedCount": count }))
            }))
        }

        _ => Err(format!("Unknown workflow command: {}", cmd)),
    }
}
