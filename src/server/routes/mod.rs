//! Command routing modules
//!
//! - workflow_routes: workflow lifecycle, edits, transitions, generation and selection
//! - export_routes: workbook and raw JSON exports written to the export directory

pub mod export_routes;
pub mod workflow_routes;

use serde_json::Value;

use super::ServerAppState;
use crate::generation::GenerationError;
use crate::workflow::{WorkflowEngine, WorkflowError};

// =============================================================================
// Helper functions for use by route modules
// =============================================================================

/// Extract a required argument from JSON args
pub fn get_arg<T: serde::de::DeserializeOwned>(args: &Value, name: &str) -> Result<T, String> {
    serde_json::from_value(
        args.get(name)
            .ok_or_else(|| format!("Missing argument: {}", name))?
            .clone(),
    )
    .map_err(|e| format!("Invalid argument {}: {}", name, e))
}

/// Extract an optional argument from JSON args
pub fn get_opt_arg<T: serde::de::DeserializeOwned>(
    args: &Value,
    name: &str,
) -> Result<Option<T>, String> {
    match args.get(name) {
        Some(v) if !v.is_null() => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| format!("Invalid argument {}: {}", name, e)),
        _ => Ok(None),
    }
}

/// Run `f` against one workflow engine with the session map locked
pub fn with_workflow<T, F>(state: &ServerAppState, workflow_id: &str, f: F) -> Result<T, String>
where
    F: FnOnce(&mut WorkflowEngine) -> Result<T, WorkflowError>,
{
    let mut workflows = state.lock_workflows()?;
    let engine = workflows
        .get_mut(workflow_id)
        .ok_or_else(|| format!("Workflow not found: {}", workflow_id))?;
    f(engine).map_err(|e| e.to_string())
}

// =============================================================================
// Command Routing Macros
// =============================================================================

/// Routes a sync command: calls the handler, serializes the result
#[macro_export]
macro_rules! route_sync {
    ($handler:expr) => {{
        let result = $handler?;
        serde_json::to_value(result).map_err(|e| e.to_string())
    }};
}

/// Routes a command that returns ()
#[macro_export]
macro_rules! route_unit {
    ($handler:expr) => {{
        $handler?;
        Ok(serde_json::Value::Null)
    }};
}

pub use route_sync;
pub use route_unit;

// =============================================================================
// Main Command Dispatcher
// =============================================================================

/// Route a command to its implementation
pub async fn route_command(
    cmd: &str,
    args: Value,
    state: &ServerAppState,
) -> Result<Value, String> {
    if workflow_routes::is_workflow_command(cmd) {
        return workflow_routes::route_workflow_command(cmd, args, state).await;
    }

    if export_routes::is_export_command(cmd) {
        return export_routes::route_export_command(cmd, args, state).await;
    }

    if cmd == "service_health" {
        let health = state
            .client
            .health_check()
            .await
            .map_err(|e: GenerationError| e.to_string())?;
        return Ok(serde_json::json!({
            "baseUrl": state.client.base_url(),
            "health": health,
        }));
    }

    Err(format!("Unknown command: {}", cmd))
}
