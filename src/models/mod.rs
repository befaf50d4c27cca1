// Data models shared with the generation service and the export layer

pub mod coverage;
pub mod parameter;

pub use coverage::{CoverageReport, RuleCoverage, TraceabilityMatrix};
pub use parameter::{DataType, Parameter, ParameterSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A discrete condition/expected-behavior pair extracted from a requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    pub condition: String,
    pub expected_behavior: String,
}

impl Rule {
    pub fn new(
        rule_id: impl Into<String>,
        condition: impl Into<String>,
        expected_behavior: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            condition: condition.into(),
            expected_behavior: expected_behavior.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterpretationStatus {
    Ok,
    Blocked,
}

impl InterpretationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpretationStatus::Ok => "OK",
            InterpretationStatus::Blocked => "BLOCKED",
        }
    }
}

/// The generation service's reading of a requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    #[serde(default)]
    pub requirement_id: String,
    #[serde(rename = "interpretation_status", alias = "status")]
    pub status: InterpretationStatus,
    #[serde(default)]
    pub interpreted_requirement: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub boundary_values: Map<String, Value>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub ambiguities: Vec<String>,
}

impl Interpretation {
    pub fn new(
        requirement_id: impl Into<String>,
        status: InterpretationStatus,
        rules: Vec<Rule>,
    ) -> Self {
        Self {
            requirement_id: requirement_id.into(),
            status,
            interpreted_requirement: String::new(),
            rules,
            constraints: Vec::new(),
            boundary_values: Map::new(),
            assumptions: Vec::new(),
            ambiguities: Vec::new(),
        }
    }

    pub fn with_ambiguities(mut self, ambiguities: Vec<String>) -> Self {
        self.ambiguities = ambiguities;
        self
    }

    pub fn is_blocked(&self) -> bool {
        self.status == InterpretationStatus::Blocked
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.rule_id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Validity {
    Valid,
    Invalid,
}

impl Validity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Validity::Valid => "VALID",
            Validity::Invalid => "INVALID",
        }
    }
}

/// Links a test case back to its requirement and rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traceability {
    pub requirement: String,
    pub rule: String,
}

/// A concrete scenario tied to exactly one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub tc_id: String,
    pub rule_id: String,
    pub test_type: String,
    pub scenario: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub expected_output: Map<String, Value>,
    pub priority: Priority,
    pub validity: Validity,
    pub traceability: Traceability,
}

impl TestCase {
    /// Create a test case whose traceability matches its rule
    pub fn new(
        tc_id: impl Into<String>,
        requirement_id: impl Into<String>,
        rule_id: impl Into<String>,
        test_type: impl Into<String>,
        validity: Validity,
    ) -> Self {
        let rule_id = rule_id.into();
        Self {
            tc_id: tc_id.into(),
            rule_id: rule_id.clone(),
            test_type: test_type.into(),
            scenario: String::new(),
            inputs: Map::new(),
            expected_output: Map::new(),
            priority: Priority::Medium,
            validity,
            traceability: Traceability {
                requirement: requirement_id.into(),
                rule: rule_id,
            },
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = scenario.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    pub fn with_expected(mut self, name: impl Into<String>, value: Value) -> Self {
        self.expected_output.insert(name.into(), value);
        self
    }
}
