//! Coverage analysis
//!
//! Computes the coverage report and traceability matrix for a rule set and a
//! test case set, and reconciles them against artifacts supplied by the
//! generation service. Everything here is a pure function over borrowed data.

use crate::models::{CoverageReport, Rule, RuleCoverage, TestCase, TraceabilityMatrix, Validity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Output of a coverage computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageAnalysis {
    pub report: CoverageReport,
    pub matrix: TraceabilityMatrix,
}

/// Compute coverage metrics and the traceability matrix.
///
/// Every rule in `rules` appears in the matrix, including rules no test case
/// covers. Test cases are matched through `traceability.rule` and keep the
/// order in which they were produced.
pub fn compute(requirement_id: &str, rules: &[Rule], test_cases: &[TestCase]) -> CoverageAnalysis {
    let mut rule_coverage = RuleCoverage::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for rule in rules {
        if seen.insert(rule.rule_id.as_str()) {
            rule_coverage.insert(rule.rule_id.clone(), Vec::new());
        }
    }

    for tc in test_cases {
        if let Some(tcs) = rule_coverage.get_mut(&tc.traceability.rule) {
            tcs.push(tc.tc_id.clone());
        }
    }

    let total_rules = rule_coverage.len();
    let rules_covered = rule_coverage.iter().filter(|(_, tcs)| !tcs.is_empty()).count();
    let valid_test_count = test_cases
        .iter()
        .filter(|tc| tc.validity == Validity::Valid)
        .count();
    let invalid_test_count = test_cases.len() - valid_test_count;
    let techniques_used: BTreeSet<String> =
        test_cases.iter().map(|tc| tc.test_type.clone()).collect();

    let report = CoverageReport {
        requirement_id: requirement_id.to_string(),
        total_rules,
        rules_covered,
        coverage_percentage: coverage_percentage(rules_covered, total_rules),
        total_test_count: test_cases.len(),
        valid_test_count,
        invalid_test_count,
        techniques_used,
    };

    let matrix = TraceabilityMatrix {
        requirement_id: requirement_id.to_string(),
        rule_coverage,
    };

    CoverageAnalysis { report, matrix }
}

/// `covered / total * 100` rounded to one decimal; 0 when there are no rules
pub fn coverage_percentage(covered: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = covered as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// One field where service-supplied coverage disagrees with the recomputation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageDiscrepancy {
    pub field: String,
    pub service: String,
    pub computed: String,
}

impl CoverageDiscrepancy {
    fn new(field: impl Into<String>, service: impl ToString, computed: impl ToString) -> Self {
        Self {
            field: field.into(),
            service: service.to_string(),
            computed: computed.to_string(),
        }
    }
}

impl std::fmt::Display for CoverageDiscrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: service reported '{}', recomputed '{}'",
            self.field, self.service, self.computed
        )
    }
}

/// Compare service-supplied artifacts against a local recomputation
pub fn reconcile(
    computed: &CoverageAnalysis,
    service_report: Option<&CoverageReport>,
    service_matrix: Option<&TraceabilityMatrix>,
) -> Vec<CoverageDiscrepancy> {
    let mut discrepancies = Vec::new();

    if let Some(service) = service_report {
        let ours = &computed.report;
        if service.total_rules != ours.total_rules {
            discrepancies.push(CoverageDiscrepancy::new(
                "total_rules",
                service.total_rules,
                ours.total_rules,
            ));
        }
        if service.rules_covered != ours.rules_covered {
            discrepancies.push(CoverageDiscrepancy::new(
                "rules_covered",
                service.rules_covered,
                ours.rules_covered,
            ));
        }
        // The service rounds to two decimals; compare at our precision
        let service_pct = (service.coverage_percentage * 10.0).round() / 10.0;
        if service_pct != ours.coverage_percentage {
            discrepancies.push(CoverageDiscrepancy::new(
                "coverage_percentage",
                service.coverage_percentage,
                ours.coverage_percentage,
            ));
        }
        if service.total_test_count != ours.total_test_count {
            discrepancies.push(CoverageDiscrepancy::new(
                "total_test_count",
                service.total_test_count,
                ours.total_test_count,
            ));
        }
        if service.valid_test_count != ours.valid_test_count {
            discrepancies.push(CoverageDiscrepancy::new(
                "valid_test_count",
                service.valid_test_count,
                ours.valid_test_count,
            ));
        }
        if service.invalid_test_count != ours.invalid_test_count {
            discrepancies.push(CoverageDiscrepancy::new(
                "invalid_test_count",
                service.invalid_test_count,
                ours.invalid_test_count,
            ));
        }
        if service.techniques_used != ours.techniques_used {
            discrepancies.push(CoverageDiscrepancy::new(
                "techniques_used",
                service.techniques_joined(", "),
                ours.techniques_joined(", "),
            ));
        }
    }

    if let Some(service) = service_matrix {
        let ours = &computed.matrix.rule_coverage;
        let mut seen: HashSet<&str> = HashSet::new();

        for (rule_id, tcs) in ours.iter() {
            seen.insert(rule_id);
            let field = format!("rule_coverage.{}", rule_id);
            match service.rule_coverage.get(rule_id) {
                Some(service_tcs) if service_tcs == tcs => {}
                Some(service_tcs) => discrepancies.push(CoverageDiscrepancy::new(
                    field,
                    service_tcs.join(", "),
                    tcs.join(", "),
                )),
                None => {
                    discrepancies.push(CoverageDiscrepancy::new(field, "<missing>", tcs.join(", ")))
                }
            }
        }

        for (rule_id, service_tcs) in service.rule_coverage.iter() {
            if !seen.contains(rule_id) {
                discrepancies.push(CoverageDiscrepancy::new(
                    format!("rule_coverage.{}", rule_id),
                    service_tcs.join(", "),
                    "<unknown rule>",
                ));
            }
        }
    }

    discrepancies
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str) -> Rule {
        Rule::new(id, "condition", "behavior")
    }

    fn tc(id: &str, rule_id: &str, test_type: &str, validity: Validity) -> TestCase {
        TestCase::new(id, "REQ-1", rule_id, test_type, validity)
    }

    #[test]
    fn test_two_rules_one_covered() {
        let rules = vec![rule("R1"), rule("R2")];
        let tcs = vec![
            tc("TC1", "R1", "Boundary Value Analysis", Validity::Valid),
            tc("TC2", "R1", "Negative Testing", Validity::Invalid),
        ];

        let analysis = compute("REQ-1", &rules, &tcs);
        let report = &analysis.report;
        assert_eq!(report.total_rules, 2);
        assert_eq!(report.rules_covered, 1);
        assert_eq!(report.coverage_percentage, 50.0);
        assert_eq!(report.total_test_count, 2);
        assert_eq!(report.valid_test_count, 1);
        assert_eq!(report.invalid_test_count, 1);

        let coverage = &analysis.matrix.rule_coverage;
        assert_eq!(coverage.len(), 2);
        assert_eq!(
            coverage.get("R1"),
            Some(&["TC1".to_string(), "TC2".to_string()][..])
        );
        assert_eq!(coverage.get("R2"), Some(&[][..]));
    }

    #[test]
    fn test_no_rules_is_zero_percent() {
        let tcs = vec![tc("TC1", "R1", "EP", Validity::Valid)];
        let analysis = compute("REQ-1", &[], &tcs);
        assert_eq!(analysis.report.coverage_percentage, 0.0);
        assert_eq!(analysis.report.total_rules, 0);
        assert!(analysis.matrix.rule_coverage.is_empty());
        assert_eq!(analysis.report.total_test_count, 1);
    }

    #[test]
    fn test_full_coverage_is_hundred() {
        let rules = vec![rule("R1"), rule("R2"), rule("R3")];
        let tcs = vec![
            tc("TC1", "R1", "EP", Validity::Valid),
            tc("TC2", "R2", "EP", Validity::Valid),
            tc("TC3", "R3", "EP", Validity::Valid),
        ];
        assert_eq!(compute("REQ-1", &rules, &tcs).report.coverage_percentage, 100.0);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(coverage_percentage(1, 3), 33.3);
        assert_eq!(coverage_percentage(2, 3), 66.7);
        assert_eq!(coverage_percentage(0, 0), 0.0);
    }

    #[test]
    fn test_test_case_for_unknown_rule_does_not_count() {
        let rules = vec![rule("R1")];
        let tcs = vec![tc("TC1", "R9", "EP", Validity::Valid)];
        let analysis = compute("REQ-1", &rules, &tcs);
        assert_eq!(analysis.report.rules_covered, 0);
        assert_eq!(analysis.report.total_test_count, 1);
        assert_eq!(analysis.matrix.rule_coverage.get("R1"), Some(&[][..]));
        assert!(!analysis.matrix.rule_coverage.contains_rule("R9"));
    }

    #[test]
    fn test_matches_on_traceability_rule() {
        let rules = vec![rule("R1"), rule("R2")];
        let mut case = tc("TC1", "R1", "EP", Validity::Valid);
        case.traceability.rule = "R2".to_string();
        let analysis = compute("REQ-1", &rules, &[case]);
        assert_eq!(analysis.matrix.rule_coverage.get("R1"), Some(&[][..]));
        assert_eq!(
            analysis.matrix.rule_coverage.get("R2"),
            Some(&["TC1".to_string()][..])
        );
    }

    #[test]
    fn test_techniques_sorted_and_distinct() {
        let tcs = vec![
            tc("TC1", "R1", "State Transition", Validity::Valid),
            tc("TC2", "R1", "Boundary Value Analysis", Validity::Valid),
            tc("TC3", "R1", "State Transition", Validity::Invalid),
        ];
        let report = compute("REQ-1", &[rule("R1")], &tcs).report;
        assert_eq!(
            report.techniques_used.into_iter().collect::<Vec<_>>(),
            vec!["Boundary Value Analysis", "State Transition"]
        );
    }

    #[test]
    fn test_compute_is_deterministic() {
        let rules = vec![rule("R2"), rule("R1")];
        let tcs = vec![
            tc("TC1", "R1", "MC/DC", Validity::Valid),
            tc("TC2", "R2", "EP", Validity::Invalid),
        ];
        let first = serde_json::to_string(&compute("REQ-1", &rules, &tcs)).unwrap();
        let second = serde_json::to_string(&compute("REQ-1", &rules, &tcs)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reconcile_detects_differences() {
        let rules = vec![rule("R1"), rule("R2")];
        let tcs = vec![tc("TC1", "R1", "EP", Validity::Valid)];
        let computed = compute("REQ-1", &rules, &tcs);

        let mut service_report = computed.report.clone();
        service_report.rules_covered = 2;
        service_report.coverage_percentage = 100.0;

        let service_matrix = TraceabilityMatrix {
            requirement_id: "REQ-1".to_string(),
            rule_coverage: vec![("R1", vec!["TC1"]), ("R3", vec![])]
                .into_iter()
                .collect(),
        };

        let found = reconcile(&computed, Some(&service_report), Some(&service_matrix));
        let fields: Vec<_> = found.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "rules_covered",
                "coverage_percentage",
                "rule_coverage.R2",
                "rule_coverage.R3"
            ]
        );
    }

    #[test]
    fn test_reconcile_tolerates_two_decimal_rounding() {
        let rules = vec![rule("R1"), rule("R2"), rule("R3")];
        let tcs = vec![tc("TC1", "R1", "EP", Validity::Valid)];
        let computed = compute("REQ-1", &rules, &tcs);
        let mut service_report = computed.report.clone();
        service_report.coverage_percentage = 33.33;
        assert!(reconcile(&computed, Some(&service_report), None).is_empty());
    }
}
