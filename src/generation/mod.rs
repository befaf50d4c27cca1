//! Boundary to the external test generation service
//!
//! The service takes a requirement plus its parameter definitions and answers
//! with an interpretation (rules, ambiguities), test cases and, optionally,
//! its own coverage artifacts. This module only defines the request/response
//! shapes, the normalized failure taxonomy and the client seam; the engine
//! decides what to do with the answer.

pub mod http;
pub mod validate;

pub use http::HttpGenerationClient;
pub use validate::{validate_response, ValidationReport};

use crate::models::{CoverageReport, Interpretation, Parameter, TestCase, TraceabilityMatrix};
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Request sent to the generation service
#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub requirement_id: String,
    pub requirement_text: String,
    pub inputs: Vec<Parameter>,
    pub outputs: Vec<Parameter>,
    /// Service access credential
    #[serde(rename = "gemini_api_key")]
    pub credential: String,
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("requirement_id", &self.requirement_id)
            .field("requirement_text", &self.requirement_text)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl GenerationRequest {
    /// Reject requests that could never be valid before sending them
    pub fn check(&self) -> Result<(), GenerationError> {
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
        if self.inputs.is_empty() {
            missing.push("inputs");
        }
        if self.outputs.is_empty() {
            missing.push("outputs");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GenerationError::ClientMisuse(format!(
                "request is missing: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Response from the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub interpretation: Interpretation,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub coverage_report: Option<CoverageReport>,
    #[serde(default)]
    pub traceability_matrix: Option<TraceabilityMatrix>,
    #[serde(default)]
    pub generation_timestamp: Option<String>,
}

/// Normalized generation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// No connection could be made, or the service did not answer in time
    #[error("No response from generation service: {0}")]
    NoResponse(String),

    /// The service answered with an error or an unusable payload
    #[error("Generation service rejected the request{}: {message}", status_suffix(.status))]
    ServiceRejected {
        status: Option<u16>,
        message: String,
    },

    /// The request assembled by the caller was malformed
    #[error("Invalid generation request: {0}")]
    ClientMisuse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl GenerationError {
    pub fn rejected(message: impl Into<String>) -> Self {
        GenerationError::ServiceRejected {
            status: None,
            message: message.into(),
        }
    }
}

/// Client seam for the generation service.
///
/// Implementations are stateless request/response adapters. Timeouts are a
/// transport concern and surface as `NoResponse`.
pub trait GenerationClient {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<GenerationResponse, GenerationError>> + Send;
}
