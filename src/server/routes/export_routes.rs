//! Export command routing
//!
//! Documents are built with the session locked and written to
//! `export.output_dir` after the lock is released.

use crate::report::{self, ExportKind};
use crate::workflow::ExportScope;
use serde_json::Value;

use super::{get_arg, get_opt_arg, route_sync, with_workflow, ServerAppState};

pub fn is_export_command(cmd: &str) -> bool {
    matches!(
        cmd,
        "export_test_cases" | "export_coverage_report" | "export_raw_json"
    )
}

/// Route export commands
pub async fn route_export_command(
    cmd: &str,
    args: Value,
    state: &ServerAppState,
) -> Result<Value, String> {
    let id: String = get_arg(&args, "workflowId")?;
    let dir = state.config.export.output_dir.clone();
    let date = report::export_date();

    match cmd {
        "export_test_cases" => {
            let scope: ExportScope = get_opt_arg(&args, "scope")?.unwrap_or_default();
            let (requirement_id, workbook) = with_workflow(state, &id, |engine| {
                let workbook = engine.export_test_cases(scope)?;
                Ok((engine.state().form.requirement_id.clone(), workbook))
            })?;
            let kind = match scope {
                ExportScope::All => ExportKind::TestCases,
                ExportScope::Selected => ExportKind::SelectedTestCases,
            };
            route_sync!(
                report::write_workbook(&dir, kind, &requirement_id, date, &workbook)
                    .map_err(|e| e.to_string())
            )
        }

        "export_coverage_report" => {
            let (requirement_id, workbook) = with_workflow(state, &id, |engine| {
                let workbook = engine.export_coverage()?;
                Ok((engine.state().form.requirement_id.clone(), workbook))
            })?;
            route_sync!(report::write_workbook(
                &dir,
                ExportKind::CoverageReport,
                &requirement_id,
                date,
                &workbook
            )
            .map_err(|e| e.to_string()))
        }

        "export_raw_json" => {
            let (requirement_id, raw) = with_workflow(state, &id, |engine| {
                let raw = engine.raw_export()?;
                Ok((engine.state().form.requirement_id.clone(), raw))
            })?;
            route_sync!(
                report::write_raw(&dir, &requirement_id, date, &raw).map_err(|e| e.to_string())
            )
        }

        _ => Err(format!("Unknown export command: {}", cmd)),
    }
}
