// Configuration file loading

use super::merger::{ConfigMerger, PartialConfig};
use super::{AppConfig, CONFIG_DIR_NAME};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the project-level config
pub const PROJECT_CONFIG_FILE: &str = ".testcase-workbench.toml";

/// Config loader
pub struct ConfigLoader {
    /// Global config path
    global_path: Option<PathBuf>,
    /// Project config path
    project_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader for the global config and `./.testcase-workbench.toml`
    pub fn new() -> Self {
        Self {
            global_path: Self::get_global_config_path(),
            project_path: Some(PathBuf::from(PROJECT_CONFIG_FILE)),
        }
    }

    /// Look for the project config in `dir` instead of the working directory
    pub fn with_project_dir(mut self, dir: &Path) -> Self {
        self.project_path = Some(dir.join(PROJECT_CONFIG_FILE));
        self
    }

    pub fn with_global_path(mut self, path: Option<PathBuf>) -> Self {
        self.global_path = path;
        self
    }

    /// Get the global config path (~/.testcase-workbench/config.toml)
    fn get_global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(CONFIG_DIR_NAME).join("config.toml"))
    }

    pub fn load_global(&self) -> Result<Option<PartialConfig>> {
        match self.global_path {
            Some(ref path) => load_from_path(path),
            None => Ok(None),
        }
    }

    pub fn load_project(&self) -> Result<Option<PartialConfig>> {
        match self.project_path {
            Some(ref path) => load_from_path(path),
            None => Ok(None),
        }
    }

    /// Load every file layer and apply `cli` on top
    pub fn load(&self, cli: Option<PartialConfig>) -> Result<AppConfig> {
        let config = ConfigMerger::new()
            .with_global(self.load_global()?)
            .with_project(self.load_project()?)
            .with_cli(cli)
            .merge();
        validate_config(&config)?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load one config layer; a missing file is not an error
pub fn load_from_path(path: &Path) -> Result<Option<PartialConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config: PartialConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;

    log::debug!("Loaded config layer {}", path.display());
    Ok(Some(config))
}

fn validate_config(config: &AppConfig) -> Result<()> {
    if config.service.timeout_secs == 0 {
        return Err(anyhow!("service.timeout_secs must be greater than 0"));
    }
    if config.service.base_url.trim().is_empty() {
        return Err(anyhow!("service.base_url must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_give_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new()
            .with_global_path(Some(temp_dir.path().join("none.toml")))
            .with_project_dir(temp_dir.path());

        assert!(loader.load_global().unwrap().is_none());
        assert_eq!(loader.load(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_layers_global_and_project_files() {
        let temp_dir = TempDir::new().unwrap();
        let global_path = temp_dir.path().join("config.toml");
        fs::write(
            &global_path,
            r#"
[service]
base_url = "http://generator.internal:8000"
timeout_secs = 45

[export]
output_dir = "/tmp/global-exports"
"#,
        )
        .unwrap();
        fs::write(
            temp_dir.path().join(PROJECT_CONFIG_FILE),
            r#"
[export]
output_dir = "artifacts"

[coverage]
trust_service = true
"#,
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_global_path(Some(global_path))
            .with_project_dir(temp_dir.path())
            .load(None)
            .unwrap();

        assert_eq!(config.service.base_url, "http://generator.internal:8000");
        assert_eq!(config.service.timeout_secs, 45);
        assert_eq!(config.export.output_dir, PathBuf::from("artifacts"));
        assert!(config.coverage.trust_service);
    }

    #[test]
    fn test_invalid_toml_is_reported_with_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(&path, "[service\nbase_url = 1").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains(PROJECT_CONFIG_FILE));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(PROJECT_CONFIG_FILE),
            "[service]\ntimeout_secs = 0\n",
        )
        .unwrap();

        let loader = ConfigLoader::new()
            .with_global_path(None)
            .with_project_dir(temp_dir.path());
        assert!(loader.load(None).is_err());
    }
}
