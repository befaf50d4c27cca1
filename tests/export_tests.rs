// Export artifacts written to disk

use chrono::NaiveDate;
use serde_json::json;
use tempfile::TempDir;
use testcase_workbench_lib::coverage;
use testcase_workbench_lib::report::{
    self, build_coverage_workbook, build_selected_workbook, build_test_case_workbook, ExportKind,
    RawExport, ReportError,
};
use testcase_workbench_lib::{Priority, Rule, TestCase, Validity};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
}

fn test_cases() -> Vec<TestCase> {
    vec![
        TestCase::new("TC001", "REQ/7", "R1", "Boundary Value Analysis", Validity::Valid)
            .with_scenario("speed just above the limit")
            .with_priority(Priority::High)
            .with_input("speed", json!(101))
            .with_expected("alarm", json!(true)),
        TestCase::new("TC002", "REQ/7", "R1", "Equivalence Partitioning", Validity::Invalid)
            .with_input("speed", json!(-1))
            .with_expected("alarm", json!(false)),
    ]
}

fn rules() -> Vec<Rule> {
    vec![
        Rule::new("R1", "speed > 100", "alarm on"),
        Rule::new("R2", "speed <= 100", "alarm off"),
    ]
}

#[test]
fn test_case_workbook_written_as_xlsx_with_sanitized_name() {
    let dir = TempDir::new().unwrap();
    let workbook = build_test_case_workbook(&test_cases()).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["REQ_7"]);

    let file = report::write_workbook(dir.path(), ExportKind::TestCases, "REQ/7", date(), &workbook)
        .unwrap();
    assert_eq!(file.filename, "test_cases_REQ_7_2026-03-09.xlsx");

    let bytes = std::fs::read(&file.path).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn workbook_bytes_do_not_depend_on_wall_clock() {
    let dir = TempDir::new().unwrap();
    let workbook = build_test_case_workbook(&test_cases()).unwrap();

    let first = report::write_workbook(&dir.path().join("a"), ExportKind::TestCases, "REQ-7", date(), &workbook)
        .unwrap();
    let second = report::write_workbook(&dir.path().join("b"), ExportKind::TestCases, "REQ-7", date(), &workbook)
        .unwrap();
    assert_eq!(
        std::fs::read(first.path).unwrap(),
        std::fs::read(second.path).unwrap()
    );
}

#[test]
fn selected_and_coverage_workbooks_use_their_prefixes() {
    let dir = TempDir::new().unwrap();
    let cases = test_cases();

    let selected: std::collections::BTreeSet<String> = ["TC002".to_string()].into_iter().collect();
    let workbook = build_selected_workbook(&cases, &selected).unwrap();
    assert_eq!(workbook.sheets[0].rows.len(), 1);
    let file = report::write_workbook(
        dir.path(),
        ExportKind::SelectedTestCases,
        "REQ-7",
        date(),
        &workbook,
    )
    .unwrap();
    assert_eq!(file.filename, "selected_test_cases_REQ-7_2026-03-09.xlsx");

    let analysis = coverage::compute("REQ-7", &rules(), &cases);
    let workbook = build_coverage_workbook(&analysis.report, &analysis.matrix);
    let file = report::write_workbook(dir.path(), ExportKind::CoverageReport, "REQ-7", date(), &workbook)
        .unwrap();
    assert_eq!(file.filename, "coverage_report_REQ-7_2026-03-09.xlsx");
    assert!(file.path.exists());
}

#[test]
fn empty_test_cases_produce_no_document() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        build_test_case_workbook(&[]),
        Err(ReportError::NothingToExport)
    ));
    assert!(matches!(
        build_selected_workbook(&test_cases(), &Default::default()),
        Err(ReportError::EmptySelection)
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn raw_export_written_into_missing_directory() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("nested").join("exports");
    let cases = test_cases();
    let analysis = coverage::compute("REQ-7", &rules(), &cases);
    let raw = RawExport::new(cases, analysis.report, analysis.matrix);

    let file = report::write_raw(&out, "REQ-7", date(), &raw).unwrap();
    assert_eq!(file.filename, "raw_export_REQ-7_2026-03-09.json");

    let content = std::fs::read_to_string(&file.path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["coverage_report"]["coverage_percentage"], 50.0);
    assert_eq!(value["traceability_matrix"]["rule_coverage"]["R1"], json!(["TC001", "TC002"]));
    assert_eq!(value["traceability_matrix"]["rule_coverage"]["R2"], json!([]));
    assert_eq!(RawExport::from_json(&content).unwrap(), raw);
}
