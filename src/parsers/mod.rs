// Requirement request file parsing (JSON and YAML)

use crate::models::{Parameter, ParameterSet};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A requirement with its parameter definitions, as read from disk
///
/// Expected YAML structure:
/// ```yaml
/// requirement_id: REQ-001
/// requirement_text: When speed exceeds 100 km/h the alarm shall sound
/// inputs:
///   - name: speed
///     data_type: int
///     unit: km/h
///     range_min: 0
///     range_max: 300
/// outputs:
///   - name: alarm
///     data_type: boolean
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementFile {
    pub requirement_id: String,
    pub requirement_text: String,
    #[serde(default)]
    pub inputs: Vec<Parameter>,
    #[serde(default)]
    pub outputs: Vec<Parameter>,
}

impl RequirementFile {
    pub fn parameters(&self) -> ParameterSet {
        ParameterSet {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(FileFormat::Json),
            "yaml" | "yml" => Some(FileFormat::Yaml),
            _ => None,
        }
    }
}

pub fn parse_requirement(content: &str, format: FileFormat) -> Result<RequirementFile> {
    let file: RequirementFile = match format {
        FileFormat::Json => {
            serde_json::from_str(content).context("Failed to parse JSON requirement file")?
        }
        FileFormat::Yaml => {
            serde_yaml::from_str(content).context("Failed to parse YAML requirement file")?
        }
    };
    Ok(file)
}

/// Read and parse a `.json`, `.yaml` or `.yml` requirement file
pub fn load_requirement(path: &Path) -> Result<RequirementFile> {
    let format = FileFormat::from_path(path).ok_or_else(|| {
        anyhow!(
            "Unsupported requirement file '{}': expected .json, .yaml or .yml",
            path.display()
        )
    })?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read requirement file '{}'", path.display()))?;
    parse_requirement(&content, format)
        .with_context(|| format!("Invalid requirement file '{}'", path.display()))
}
