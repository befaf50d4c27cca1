// Secure storage for the generation service credential
//
// Tokens are stored in ~/.testcase-workbench/secrets.toml (global only,
// never project-level)

use super::CONFIG_DIR_NAME;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Token key for the generation service
pub const GENERATION_TOKEN: &str = "generation";

/// Secrets stored in ~/.testcase-workbench/secrets.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    /// API tokens indexed by service (e.g. "generation" -> "sk-...")
    #[serde(default)]
    pub api_tokens: HashMap<String, String>,
}

impl SecretsConfig {
    /// Get the secrets file path (~/.testcase-workbench/secrets.toml)
    pub fn get_secrets_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(CONFIG_DIR_NAME).join("secrets.toml"))
    }

    /// Load secrets from the default location
    pub fn load() -> Result<Self> {
        let path = Self::get_secrets_path()
            .ok_or_else(|| anyhow!("Could not determine home directory"))?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read secrets file '{}'", path.display()))?;
        let config: SecretsConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse secrets file '{}'", path.display()))?;

        Ok(config)
    }

    /// Save secrets to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::get_secrets_path()
            .ok_or_else(|| anyhow!("Could not determine home directory"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create secrets directory '{}'", parent.display())
                })?;
            }
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| anyhow!("Failed to serialize secrets: {}", e))?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write secrets file '{}'", path.display()))?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).with_context(|| {
                format!("Failed to set permissions on secrets file '{}'", path.display())
            })?;
        }

        log::info!("Saved secrets to: {}", path.display());
        Ok(())
    }

    pub fn get_token(&self, service: &str) -> Option<&String> {
        self.api_tokens.get(service)
    }

    pub fn set_token(&mut self, service: &str, token: &str) {
        self.api_tokens.insert(service.to_string(), token.to_string());
    }

    pub fn delete_token(&mut self, service: &str) -> bool {
        self.api_tokens.remove(service).is_some()
    }

    /// The stored generation service credential, if non-blank
    pub fn generation_token(&self) -> Option<&str> {
        self.get_token(GENERATION_TOKEN)
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Resolve the generation credential: explicit value first, then secrets file
pub fn resolve_credential(explicit: Option<&str>, secrets: &SecretsConfig) -> Option<String> {
    explicit
        .filter(|k| !k.trim().is_empty())
        .or_else(|| secrets.generation_token())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_delete_token() {
        let mut config = SecretsConfig::default();
        config.set_token(GENERATION_TOKEN, "sk-123");
        assert_eq!(config.generation_token(), Some("sk-123"));
        assert!(config.delete_token(GENERATION_TOKEN));
        assert!(!config.delete_token(GENERATION_TOKEN));
        assert_eq!(config.generation_token(), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("secrets.toml");

        let mut config = SecretsConfig::default();
        config.set_token(GENERATION_TOKEN, "sk-abc");
        config.save_to(&path).unwrap();

        let loaded = SecretsConfig::load_from(&path).unwrap();
        assert_eq!(loaded.generation_token(), Some("sk-abc"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_resolve_credential_prefers_explicit_value() {
        let mut secrets = SecretsConfig::default();
        secrets.set_token(GENERATION_TOKEN, "from-file");

        assert_eq!(
            resolve_credential(Some("from-env"), &secrets).as_deref(),
            Some("from-env")
        );
        assert_eq!(
            resolve_credential(Some("  "), &secrets).as_deref(),
            Some("from-file")
        );
        assert_eq!(resolve_credential(None, &SecretsConfig::default()), None);
    }
}
