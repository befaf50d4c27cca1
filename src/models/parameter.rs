// Input/output parameter definitions

use serde::{Deserialize, Serialize};

/// Data type of a parameter, as understood by the generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[serde(alias = "integer")]
    Int,
    Float,
    String,
    #[serde(alias = "bool")]
    Boolean,
}

impl DataType {
    /// Returns the wire representation of this data type
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Boolean => "boolean",
        }
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::Int
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single input or output parameter definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_max: Option<f64>,
    /// Allowed values for an input parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    /// Possible values for an output parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possible_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// Create a parameter with only a name and a type
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ..Default::default()
        }
    }

    /// Set an inclusive numeric range
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range_min = Some(min);
        self.range_max = Some(max);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Check the definition is well formed
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("parameter name must not be empty".to_string());
        }

        if let (Some(min), Some(max)) = (self.range_min, self.range_max) {
            if min.is_nan() || max.is_nan() {
                return Err(format!("parameter '{}' has a NaN range bound", self.name));
            }
            if min > max {
                return Err(format!(
                    "parameter '{}' has range_min {} greater than range_max {}",
                    self.name, min, max
                ));
            }
        }

        Ok(())
    }
}

/// Input and output parameter definitions collected by the workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub inputs: Vec<Parameter>,
    pub outputs: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|p| p.name == name)
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|p| p.name == name)
    }
}
