// Configuration merging with priority

use super::{AppConfig, CoverageConfig, ExportConfig, ServerConfig, ServiceConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Partial configuration for merging
/// Uses Option<T> for all fields so a layer only overrides what it sets
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PartialConfig {
    #[serde(default)]
    pub service: Option<PartialServiceConfig>,
    #[serde(default)]
    pub coverage: Option<PartialCoverageConfig>,
    #[serde(default)]
    pub export: Option<PartialExportConfig>,
    #[serde(default)]
    pub server: Option<PartialServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PartialServiceConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PartialCoverageConfig {
    pub trust_service: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PartialExportConfig {
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PartialServerConfig {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub cors_origins: Option<Vec<String>>,
}

/// Configuration merger
/// Priority order: CLI -> Project -> Global -> Defaults
pub struct ConfigMerger {
    defaults: AppConfig,
    global: Option<PartialConfig>,
    project: Option<PartialConfig>,
    cli: Option<PartialConfig>,
}

impl ConfigMerger {
    /// Create a new config merger with defaults
    pub fn new() -> Self {
        Self {
            defaults: AppConfig::default(),
            global: None,
            project: None,
            cli: None,
        }
    }

    pub fn with_global(mut self, config: Option<PartialConfig>) -> Self {
        self.global = config;
        self
    }

    pub fn with_project(mut self, config: Option<PartialConfig>) -> Self {
        self.project = config;
        self
    }

    pub fn with_cli(mut self, config: Option<PartialConfig>) -> Self {
        self.cli = config;
        self
    }

    /// Merge all layers, lowest priority first
    pub fn merge(&self) -> AppConfig {
        [&self.global, &self.project, &self.cli]
            .into_iter()
            .flatten()
            .fold(self.defaults.clone(), |base, layer| merge_partial(&base, layer))
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_partial(base: &AppConfig, partial: &PartialConfig) -> AppConfig {
    AppConfig {
        service: partial
            .service
            .as_ref()
            .map(|p| merge_service(&base.service, p))
            .unwrap_or_else(|| base.service.clone()),
        coverage: partial
            .coverage
            .as_ref()
            .map(|p| CoverageConfig {
                trust_service: p.trust_service.unwrap_or(base.coverage.trust_service),
            })
            .unwrap_or_else(|| base.coverage.clone()),
        export: partial
            .export
            .as_ref()
            .map(|p| ExportConfig {
                output_dir: p
                    .output_dir
                    .clone()
                    .unwrap_or_else(|| base.export.output_dir.clone()),
            })
            .unwrap_or_else(|| base.export.clone()),
        server: partial
            .server
            .as_ref()
            .map(|p| merge_server(&base.server, p))
            .unwrap_or_else(|| base.server.clone()),
    }
}

fn merge_service(base: &ServiceConfig, over: &PartialServiceConfig) -> ServiceConfig {
    ServiceConfig {
        base_url: over
            .base_url
            .clone()
            .unwrap_or_else(|| base.base_url.clone()),
        timeout_secs: over.timeout_secs.unwrap_or(base.timeout_secs),
    }
}

fn merge_server(base: &ServerConfig, over: &PartialServerConfig) -> ServerConfig {
    ServerConfig {
        port: over.port.unwrap_or(base.port),
        bind: over.bind.clone().unwrap_or_else(|| base.bind.clone()),
        cors_origins: over
            .cors_origins
            .clone()
            .or_else(|| base.cors_origins.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_defaults_only() {
        let merged = ConfigMerger::new().merge();
        assert_eq!(merged, AppConfig::default());
    }

    #[test]
    fn test_project_overrides_global() {
        let global: PartialConfig = toml::from_str(
            r#"
            [service]
            base_url = "http://global:8000"
            timeout_secs = 30
            "#,
        )
        .unwrap();
        let project: PartialConfig = toml::from_str(
            r#"
            [service]
            base_url = "http://project:9000"
            "#,
        )
        .unwrap();

        let merged = ConfigMerger::new()
            .with_global(Some(global))
            .with_project(Some(project))
            .merge();

        assert_eq!(merged.service.base_url, "http://project:9000");
        // Not set by the project layer, so the global value survives
        assert_eq!(merged.service.timeout_secs, 30);
    }

    #[test]
    fn test_cli_has_highest_priority() {
        let project = PartialConfig {
            server: Some(PartialServerConfig {
                port: Some(4000),
                bind: Some("0.0.0.0".to_string()),
                ..Default::default()
            }),
            coverage: Some(PartialCoverageConfig {
                trust_service: Some(true),
            }),
            ..Default::default()
        };
        let cli = PartialConfig {
            server: Some(PartialServerConfig {
                port: Some(5000),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = ConfigMerger::new()
            .with_project(Some(project))
            .with_cli(Some(cli))
            .merge();

        assert_eq!(merged.server.port, 5000);
        assert_eq!(merged.server.bind, "0.0.0.0");
        assert!(merged.coverage.trust_service);
        assert_eq!(merged.export.output_dir, PathBuf::from("exports"));
    }
}
