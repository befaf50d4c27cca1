//! Test Case Generation Workflow
//!
//! Drives one requirement from free text to exportable, traceable test cases.
//!
//! ## Workflow Steps
//!
//! 1. **Requirement** - Requirement id, text and service credential
//! 2. **Inputs** - Input parameter definitions
//! 3. **Outputs** - Output parameter definitions; leaving runs generation
//! 4. **Interpretation** - Rules and ambiguities from the service (ambiguity gate)
//! 5. **Test Cases** - Generated test cases and the export selection
//! 6. **Export** - Test case workbook, coverage workbook and raw JSON
//!
//! ## Key Properties
//!
//! - **Single owner**: all state lives in one `WorkflowEngine`
//! - **Single in-flight generation**: other operations are rejected, not queued
//! - **Atomic derived data**: interpretation, test cases and coverage are
//!   stored together or not at all
//! - **Ambiguity gate**: a BLOCKED interpretation never reaches Test Cases

pub mod engine;
pub mod error;
pub mod selection;
pub mod state;


// Re-export main types
pub use engine::{CoveragePolicy, ExportScope, GenerationTicket, RequirementUpdate, WorkflowEngine};
pub use error::WorkflowError;
pub use selection::SelectionTracker;
pub use state::{FormData, GenerationOutcome, WorkflowState, WorkflowStep};
