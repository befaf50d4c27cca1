// Per-requirement test case workbook

use super::{Cell, Column, ReportError, Sheet, Workbook, MAX_SHEET_NAME_LEN};
use crate::models::TestCase;
use std::collections::{BTreeSet, HashMap};

const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

fn columns() -> Vec<Column> {
    vec![
        Column::new("Test Case ID", 15.0),
        Column::new("Rule ID", 10.0),
        Column::new("Test Type", 25.0),
        Column::new("Scenario", 40.0),
        Column::new("Inputs", 35.0),
        Column::new("Expected Output", 35.0),
        Column::new("Priority", 10.0),
        Column::new("Validity", 10.0),
        Column::new("Requirement", 15.0),
        Column::new("Rule", 10.0),
    ]
}

/// Sheet name for a requirement id: forbidden characters replaced, then
/// truncated to the host limit
pub fn sheet_name_for(requirement_id: &str) -> String {
    let cleaned: String = requirement_id
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_matches('\'').to_string();

    if cleaned.trim().is_empty() {
        "Requirement".to_string()
    } else {
        cleaned
    }
}

fn structured(value: &serde_json::Map<String, serde_json::Value>) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn row_for(tc: &TestCase) -> Result<Vec<Cell>, ReportError> {
    Ok(vec![
        Cell::text(&tc.tc_id),
        Cell::text(&tc.rule_id),
        Cell::text(&tc.test_type),
        Cell::text(&tc.scenario),
        Cell::text(structured(&tc.inputs)?),
        Cell::text(structured(&tc.expected_output)?),
        Cell::text(tc.priority.as_str()),
        Cell::text(tc.validity.as_str()),
        Cell::text(&tc.traceability.requirement),
        Cell::text(&tc.traceability.rule),
    ])
}

/// Build the test case workbook: one sheet per distinct
/// `traceability.requirement`, in first-appearance order
pub fn build_test_case_workbook(test_cases: &[TestCase]) -> Result<Workbook, ReportError> {
    if test_cases.is_empty() {
        return Err(ReportError::NothingToExport);
    }

    let mut workbook = Workbook::default();
    // lowercased sheet name -> (requirement id, sheet index); hosts compare
    // sheet names case-insensitively
    let mut sheets: HashMap<String, (String, usize)> = HashMap::new();

    for tc in test_cases {
        let requirement = &tc.traceability.requirement;
        let name = sheet_name_for(requirement);

        let key = name.to_lowercase();

        let index = match sheets.get(&key) {
            Some((owner, index)) if owner == requirement => *index,
            Some((owner, _)) => {
                return Err(ReportError::SheetNameCollision {
                    sheet: name,
                    first: owner.clone(),
                    second: requirement.clone(),
                });
            }
            None => {
                let index = workbook.sheets.len();
                workbook.sheets.push(Sheet::new(name.clone(), columns()));
                sheets.insert(key, (requirement.clone(), index));
                index
            }
        };

        workbook.sheets[index].push_row(row_for(tc)?);
    }

    Ok(workbook)
}

/// Build the test case workbook from the selected subset, keeping the order
/// in which the test cases were produced
pub fn build_selected_workbook(
    test_cases: &[TestCase],
    selected: &BTreeSet<String>,
) -> Result<Workbook, ReportError> {
    let chosen: Vec<TestCase> = test_cases
        .iter()
        .filter(|tc| selected.contains(&tc.tc_id))
        .cloned()
        .collect();

    if chosen.is_empty() {
        return Err(ReportError::EmptySelection);
    }

    build_test_case_workbook(&chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Validity};
    use serde_json::json;

    fn tc(id: &str, requirement: &str) -> TestCase {
        TestCase::new(id, requirement, "R1", "Boundary Value Analysis", Validity::Valid)
            .with_scenario("speed at upper bound")
            .with_priority(Priority::High)
            .with_input("speed", json!(100))
            .with_expected("alarm", json!(false))
    }

    #[test]
    fn test_empty_set_is_nothing_to_export() {
        assert!(matches!(
            build_test_case_workbook(&[]),
            Err(ReportError::NothingToExport)
        ));
    }

    #[test]
    fn test_rows_and_columns() {
        let workbook = build_test_case_workbook(&[tc("TC1", "REQ-1")]).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["REQ-1"]);

        let sheet = &workbook.sheets[0];
        let headers: Vec<_> = sheet.columns.iter().map(|c| c.header.as_str()).collect();
        assert_eq!(
            headers,
            vec![
                "Test Case ID",
                "Rule ID",
                "Test Type",
                "Scenario",
                "Inputs",
                "Expected Output",
                "Priority",
                "Validity",
                "Requirement",
                "Rule"
            ]
        );

        let row = &sheet.rows[0];
        assert_eq!(row[0].as_text(), Some("TC1"));
        assert_eq!(row[4].as_text(), Some("{\n  \"speed\": 100\n}"));
        assert_eq!(row[6].as_text(), Some("HIGH"));
        assert_eq!(row[7].as_text(), Some("VALID"));
        assert_eq!(row[8].as_text(), Some("REQ-1"));
    }

    #[test]
    fn test_sheets_follow_first_appearance() {
        let workbook = build_test_case_workbook(&[
            tc("TC1", "REQ-B"),
            tc("TC2", "REQ-A"),
            tc("TC3", "REQ-B"),
        ])
        .unwrap();
        assert_eq!(workbook.sheet_names(), vec!["REQ-B", "REQ-A"]);
        assert_eq!(workbook.sheets[0].rows.len(), 2);
        assert_eq!(workbook.sheets[1].rows.len(), 1);
    }

    #[test]
    fn test_sheet_name_truncation_and_cleanup() {
        let long = "A".repeat(40);
        assert_eq!(sheet_name_for(&long).len(), 31);
        assert_eq!(sheet_name_for("SYS/REQ:1"), "SYS_REQ_1");
        assert_eq!(sheet_name_for(""), "Requirement");
    }

    #[test]
    fn test_truncation_collision_is_reported() {
        let base = "REQUIREMENT-WITH-A-VERY-LONG-ID";
        assert_eq!(base.len(), 31);
        let first = format!("{}-ALPHA", base);
        let second = format!("{}-BETA", base);

        match build_test_case_workbook(&[tc("TC1", &first), tc("TC2", &second)]) {
            Err(ReportError::SheetNameCollision {
                sheet,
                first: a,
                second: b,
            }) => {
                assert_eq!(sheet, base);
                assert_eq!(a, first);
                assert_eq!(b, second);
            }
            other => panic!("expected collision, got {:?}", other),
        }
    }

    #[test]
    fn test_case_only_difference_is_a_collision() {
        match build_test_case_workbook(&[tc("TC1", "REQ-a"), tc("TC2", "REQ-A")]) {
            Err(ReportError::SheetNameCollision {
                sheet,
                first,
                second,
            }) => {
                assert_eq!(sheet, "REQ-A");
                assert_eq!(first, "REQ-a");
                assert_eq!(second, "REQ-A");
            }
            other => panic!("expected collision, got {:?}", other),
        }
    }

    #[test]
    fn test_selected_subset() {
        let all = vec![tc("TC1", "REQ-1"), tc("TC2", "REQ-1"), tc("TC3", "REQ-1")];
        let selected: BTreeSet<String> = ["TC3", "TC1"].iter().map(|s| s.to_string()).collect();
        let workbook = build_selected_workbook(&all, &selected).unwrap();
        let ids: Vec<_> = workbook.sheets[0]
            .rows
            .iter()
            .map(|r| r[0].as_text().unwrap())
            .collect();
        assert_eq!(ids, vec!["TC1", "TC3"]);
    }

    #[test]
    fn test_empty_selection_rejected() {
        let all = vec![tc("TC1", "REQ-1")];
        assert!(matches!(
            build_selected_workbook(&all, &BTreeSet::new()),
            Err(ReportError::EmptySelection)
        ));
    }

    #[test]
    fn test_identical_input_identical_document() {
        let cases = vec![tc("TC1", "REQ-1"), tc("TC2", "REQ-2")];
        let first = build_test_case_workbook(&cases).unwrap();
        let second = build_test_case_workbook(&cases).unwrap();
        assert_eq!(first, second);
    }
}
