// Consistency checks on generation service output

use super::{GenerationError, GenerationResponse};
use crate::models::ParameterSet;
use std::collections::HashSet;

/// Soft findings from a response that passed validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

/// Validate a service response against the request that produced it.
///
/// Structural violations (duplicate ids, dangling rule references,
/// traceability that does not match the test case) reject the whole response.
/// Findings that leave the data usable are returned as warnings.
pub fn validate_response(
    response: &GenerationResponse,
    requirement_id: &str,
    parameters: &ParameterSet,
) -> Result<ValidationReport, GenerationError> {
    let interpretation = &response.interpretation;
    let mut rule_ids: HashSet<&str> = HashSet::new();
    for rule in &interpretation.rules {
        if !rule_ids.insert(rule.rule_id.as_str()) {
            return Err(GenerationError::rejected(format!(
                "Duplicate rule id '{}' in interpretation",
                rule.rule_id
            )));
        }
    }

    let mut tc_ids: HashSet<&str> = HashSet::new();
    for tc in &response.test_cases {
        if !tc_ids.insert(tc.tc_id.as_str()) {
            return Err(GenerationError::rejected(format!(
                "Duplicate test case id '{}'",
                tc.tc_id
            )));
        }
        if !rule_ids.contains(tc.rule_id.as_str()) {
            return Err(GenerationError::rejected(format!(
                "Test case '{}' references unknown rule '{}'",
                tc.tc_id, tc.rule_id
            )));
        }
        if tc.traceability.rule != tc.rule_id {
            return Err(GenerationError::rejected(format!(
                "Test case '{}' traces to rule '{}' but belongs to rule '{}'",
                tc.tc_id, tc.traceability.rule, tc.rule_id
            )));
        }
        if tc.traceability.requirement != requirement_id {
            return Err(GenerationError::rejected(format!(
                "Test case '{}' traces to requirement '{}' instead of '{}'",
                tc.tc_id, tc.traceability.requirement, requirement_id
            )));
        }
    }

    let mut report = ValidationReport::default();

    if interpretation.is_blocked() && interpretation.ambiguities.is_empty() {
        report
            .warnings
            .push("Interpretation is BLOCKED but lists no ambiguities".to_string());
    }
    if !interpretation.is_blocked() && interpretation.rules.is_empty() {
        report
            .warnings
            .push("Interpretation is OK but no rules were extracted".to_string());
    }
    for name in interpretation.boundary_values.keys() {
        if !parameters.has_input(name) {
            report
                .warnings
                .push(format!("Boundary value references unknown input: {}", name));
        }
    }

    for warning in &report.warnings {
        log::warn!("Generation response for '{}': {}", requirement_id, warning);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DataType, Interpretation, InterpretationStatus, Parameter, Rule, TestCase, Validity,
    };

    fn params() -> ParameterSet {
        ParameterSet {
            inputs: vec![Parameter::new("speed", DataType::Int)],
            outputs: vec![Parameter::new("alarm", DataType::Boolean)],
        }
    }

    fn response(status: InterpretationStatus, test_cases: Vec<TestCase>) -> GenerationResponse {
        GenerationResponse {
            interpretation: Interpretation {
                requirement_id: "REQ-1".to_string(),
                status,
                interpreted_requirement: "alarm when speed > 100".to_string(),
                rules: vec![Rule::new("R1", "speed > 100", "alarm on")],
                constraints: vec![],
                boundary_values: serde_json::Map::new(),
                assumptions: vec![],
                ambiguities: vec![],
            },
            test_cases,
            coverage_report: None,
            traceability_matrix: None,
            generation_timestamp: None,
        }
    }

    #[test]
    fn test_valid_response_passes() {
        let resp = response(
            InterpretationStatus::Ok,
            vec![TestCase::new("TC1", "REQ-1", "R1", "BVA", Validity::Valid)],
        );
        let report = validate_response(&resp, "REQ-1", &params()).unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_tc_id_rejected() {
        let resp = response(
            InterpretationStatus::Ok,
            vec![
                TestCase::new("TC1", "REQ-1", "R1", "BVA", Validity::Valid),
                TestCase::new("TC1", "REQ-1", "R1", "BVA", Validity::Invalid),
            ],
        );
        assert!(matches!(
            validate_response(&resp, "REQ-1", &params()),
            Err(GenerationError::ServiceRejected { .. })
        ));
    }

    #[test]
    fn test_dangling_rule_rejected() {
        let resp = response(
            InterpretationStatus::Ok,
            vec![TestCase::new("TC1", "REQ-1", "R7", "BVA", Validity::Valid)],
        );
        let err = validate_response(&resp, "REQ-1", &params()).unwrap_err();
        assert!(err.to_string().contains("unknown rule 'R7'"));
    }

    #[test]
    fn test_traceability_mismatch_rejected() {
        let mut tc = TestCase::new("TC1", "REQ-1", "R1", "BVA", Validity::Valid);
        tc.traceability.rule = "R2".to_string();
        let resp = response(InterpretationStatus::Ok, vec![tc]);
        assert!(validate_response(&resp, "REQ-1", &params()).is_err());

        let tc = TestCase::new("TC1", "REQ-2", "R1", "BVA", Validity::Valid);
        let resp = response(InterpretationStatus::Ok, vec![tc]);
        assert!(validate_response(&resp, "REQ-1", &params()).is_err());
    }

    #[test]
    fn test_soft_findings_become_warnings() {
        let mut resp = response(InterpretationStatus::Blocked, vec![]);
        resp.interpretation
            .boundary_values
            .insert("altitude".to_string(), serde_json::json!([0, 1000]));
        let report = validate_response(&resp, "REQ-1", &params()).unwrap();
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("no ambiguities"));
        assert!(report.warnings[1].contains("altitude"));
    }
}
