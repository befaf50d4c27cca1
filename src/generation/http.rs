// HTTP client for the generation service

use super::{GenerationClient, GenerationError, GenerationRequest, GenerationResponse};
use serde::Deserialize;
use std::time::Duration;

/// Path of the generation endpoint on the service
pub const GENERATE_PATH: &str = "/generate-test-cases";
/// Path of the health endpoint on the service
pub const HEALTH_PATH: &str = "/health";

/// Error body returned by the service on rejection
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    detail: Option<serde_json::Value>,
}

/// Generation service client over HTTP/JSON
#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGenerationClient {
    /// Create a client for the service at `base_url` with a request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("testcase-workbench/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GenerationError::ClientMisuse(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check the service is reachable and healthy
    pub async fn health_check(&self) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .client
            .get(self.url(HEALTH_PATH))
            .send()
            .await
            .map_err(normalize_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(rejection(status, &text));
        }

        response
            .json()
            .await
            .map_err(|e| GenerationError::rejected(format!("Failed to parse health response: {}", e)))
    }
}

impl GenerationClient for HttpGenerationClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        request.check()?;

        log::info!(
            "Requesting generation for '{}' ({} inputs, {} outputs)",
            request.requirement_id,
            request.inputs.len(),
            request.outputs.len()
        );

        let response = self
            .client
            .post(self.url(GENERATE_PATH))
            .json(request)
            .send()
            .await
            .map_err(normalize_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            log::warn!("Generation service returned {}: {}", status, text);
            return Err(rejection(status, &text));
        }

        let body = response
            .text()
            .await
            .map_err(normalize_transport_error)?;

        serde_json::from_str(&body)
            .map_err(|e| GenerationError::rejected(format!("Malformed service response: {}", e)))
    }
}

/// Map a reqwest failure onto the normalized taxonomy
fn normalize_transport_error(err: reqwest::Error) -> GenerationError {
    if err.is_builder() {
        GenerationError::ClientMisuse(err.to_string())
    } else if err.is_timeout() {
        GenerationError::NoResponse(format!("request timed out: {}", err))
    } else if err.is_connect() {
        GenerationError::NoResponse(format!("could not connect: {}", err))
    } else {
        GenerationError::NoResponse(err.to_string())
    }
}

/// Build a rejection from a non-success status, preferring the service's `detail`
fn rejection(status: reqwest::StatusCode, text: &str) -> GenerationError {
    let message = serde_json::from_str::<ServiceErrorBody>(text)
        .ok()
        .and_then(|body| body.detail)
        .map(|detail| match detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Failed to generate test cases")
                    .to_string()
            } else {
                text.to_string()
            }
        });

    GenerationError::ServiceRejected {
        status: Some(status.as_u16()),
        message,
    }
}
