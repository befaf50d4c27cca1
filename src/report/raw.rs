// Raw structured-data export for machine-to-machine integration

use super::ReportError;
use crate::models::{CoverageReport, TestCase, TraceabilityMatrix};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawExport {
    pub test_cases: Vec<TestCase>,
    pub coverage_report: CoverageReport,
    pub traceability_matrix: TraceabilityMatrix,
}

impl RawExport {
    pub fn new(
        test_cases: Vec<TestCase>,
        coverage_report: CoverageReport,
        traceability_matrix: TraceabilityMatrix,
    ) -> Self {
        Self {
            test_cases,
            coverage_report,
            traceability_matrix,
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage;
    use crate::models::{Rule, Validity};

    #[test]
    fn test_raw_export_keeps_rule_order_and_top_level_keys() {
        let rules = vec![Rule::new("R2", "c", "b"), Rule::new("R1", "c", "b")];
        let tcs = vec![TestCase::new("TC1", "REQ-1", "R1", "EP", Validity::Valid)];
        let analysis = coverage::compute("REQ-1", &rules, &tcs);

        let export = RawExport::new(tcs, analysis.report, analysis.matrix);
        let json = export.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("test_cases").is_some());
        assert!(value.get("coverage_report").is_some());
        assert!(value.get("traceability_matrix").is_some());

        let r2 = json.find("\"R2\": []").unwrap();
        let r1 = json.find("\"R1\": [").unwrap();
        assert!(r2 < r1);

        assert_eq!(RawExport::from_json(&json).unwrap(), export);
    }
}
