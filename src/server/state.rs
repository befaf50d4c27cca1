//! Server application state shared across handlers

use crate::config::AppConfig;
use crate::generation::HttpGenerationClient;
use crate::shutdown::ShutdownState;
use crate::workflow::{CoveragePolicy, WorkflowEngine};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Workflow sessions keyed by id
pub type WorkflowMap = HashMap<String, WorkflowEngine>;

#[derive(Clone)]
pub struct ServerAppState {
    /// Authentication token for this server run
    pub auth_token: String,

    pub config: Arc<AppConfig>,

    /// Client for the generation service, shared by all sessions
    pub client: Arc<HttpGenerationClient>,

    /// Credential used to pre-fill new workflows, if one is configured
    pub default_credential: Option<String>,

    /// One single-owner engine per session. Never held across an await.
    pub workflows: Arc<Mutex<WorkflowMap>>,

    pub shutdown_state: ShutdownState,
}

impl ServerAppState {
    pub fn new(
        auth_token: String,
        config: AppConfig,
        client: HttpGenerationClient,
        default_credential: Option<String>,
        shutdown_state: ShutdownState,
    ) -> Self {
        Self {
            auth_token,
            config: Arc::new(config),
            client: Arc::new(client),
            default_credential,
            workflows: Arc::new(Mutex::new(HashMap::new())),
            shutdown_state,
        }
    }

    pub fn coverage_policy(&self) -> CoveragePolicy {
        CoveragePolicy::from_trust_flag(self.config.coverage.trust_service)
    }

    pub fn lock_workflows(&self) -> Result<MutexGuard<'_, WorkflowMap>, String> {
        self.workflows
            .lock()
            .map_err(|e| format!("Workflow store unavailable: {}", e))
    }
}
