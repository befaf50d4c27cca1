// Clippy allows for reasonable defaults
// These suppress warnings where the suggested change doesn't improve readability
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::derivable_impls)] // Explicit Default impls can be clearer
#![allow(clippy::field_reassign_with_default)] // Builder pattern is clearer
#![allow(clippy::needless_borrow)] // Explicit borrows can clarify ownership
#![allow(clippy::clone_on_copy)] // .clone() can be clearer than implicit copy
#![allow(clippy::redundant_closure)] // |x| f(x) can be clearer than f
#![allow(clippy::unwrap_or_default)] // unwrap_or_else(Default::default) can be clearer

// Module declarations
pub mod config;
pub mod coverage;
pub mod generation;
pub mod models;
pub mod parsers;
pub mod report;
pub mod shutdown;
pub mod workflow;

// Server module (HTTP API)
pub mod server;

// Re-export models and the workflow surface
pub use models::*;
pub use workflow::{
    CoveragePolicy, ExportScope, RequirementUpdate, WorkflowEngine, WorkflowError, WorkflowState,
    WorkflowStep,
};
