// Coverage summary and traceability workbook

use super::{Cell, Column, Sheet, Workbook};
use crate::models::{CoverageReport, TraceabilityMatrix};

pub const SUMMARY_SHEET: &str = "Coverage Summary";
pub const TRACEABILITY_SHEET: &str = "Traceability";

/// Build the two-sheet coverage workbook.
///
/// The traceability sheet has one row per rule in the matrix, uncovered
/// rules included.
pub fn build_coverage_workbook(report: &CoverageReport, matrix: &TraceabilityMatrix) -> Workbook {
    let mut summary = Sheet::new(
        SUMMARY_SHEET,
        vec![Column::new("Metric", 25.0), Column::new("Value", 40.0)],
    );
    let metrics = [
        ("Requirement ID", Cell::text(&report.requirement_id)),
        ("Total Rules", Cell::count(report.total_rules)),
        ("Rules Covered", Cell::count(report.rules_covered)),
        (
            "Coverage Percentage",
            Cell::text(format!("{:.1}%", report.coverage_percentage)),
        ),
        ("Total Test Cases", Cell::count(report.total_test_count)),
        ("Valid Test Cases", Cell::count(report.valid_test_count)),
        ("Invalid Test Cases", Cell::count(report.invalid_test_count)),
        ("Techniques Used", Cell::text(report.techniques_joined(", "))),
    ];
    for (metric, value) in metrics {
        summary.push_row(vec![Cell::text(metric), value]);
    }

    let mut trace = Sheet::new(
        TRACEABILITY_SHEET,
        vec![Column::new("Rule ID", 15.0), Column::new("Test Case IDs", 60.0)],
    );
    for (rule_id, tc_ids) in matrix.rule_coverage.iter() {
        trace.push_row(vec![Cell::text(rule_id), Cell::text(tc_ids.join(", "))]);
    }

    Workbook {
        sheets: vec![summary, trace],
    }
}
