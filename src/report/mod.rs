//! Export document assembly
//!
//! Builders turn test cases and coverage artifacts into ordered, in-memory
//! workbooks. Writing them to disk (`xlsx`) and naming the files
//! (`export_filename`) are kept apart so a document body never depends on
//! the export date.
//!
//! ## Products
//!
//! - **Test case workbook**: one sheet per requirement id
//! - **Coverage workbook**: `Coverage Summary` and `Traceability` sheets
//! - **Raw export**: `{test_cases, coverage_report, traceability_matrix}` JSON

pub mod coverage_workbook;
pub mod raw;
pub mod test_case_workbook;
pub mod xlsx;

pub use coverage_workbook::build_coverage_workbook;
pub use raw::RawExport;
pub use test_case_workbook::{build_selected_workbook, build_test_case_workbook, sheet_name_for};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum sheet name length accepted by spreadsheet hosts
pub const MAX_SHEET_NAME_LEN: usize = 31;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No test cases to export")]
    NothingToExport,

    #[error("No test cases selected for export")]
    EmptySelection,

    #[error("Requirements '{first}' and '{second}' both map to sheet name '{sheet}'")]
    SheetNameCollision {
        sheet: String,
        first: String,
        second: String,
    },

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to serialize export: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn number(value: impl Into<f64>) -> Self {
        Cell::Number(value.into())
    }

    pub fn count(value: usize) -> Self {
        Cell::Number(value as f64)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }
}

/// Column header and display width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub header: String,
    pub width: f64,
}

impl Column {
    pub fn new(header: impl Into<String>, width: f64) -> Self {
        Self {
            header: header.into(),
            width,
        }
    }
}

/// One sheet: a header row followed by data rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

/// An ordered multi-sheet document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Kinds of export artifact, each with its own filename prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    TestCases,
    SelectedTestCases,
    CoverageReport,
    RawJson,
}

impl ExportKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ExportKind::TestCases => "test_cases",
            ExportKind::SelectedTestCases => "selected_test_cases",
            ExportKind::CoverageReport => "coverage_report",
            ExportKind::RawJson => "raw_export",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportKind::RawJson => "json",
            _ => "xlsx",
        }
    }
}

/// Build an export filename from the requirement id and a calendar date
pub fn export_filename(kind: ExportKind, requirement_id: &str, date: NaiveDate) -> String {
    let safe_id: String = requirement_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe_id = if safe_id.is_empty() {
        "requirement".to_string()
    } else {
        safe_id
    };

    format!(
        "{}_{}_{}.{}",
        kind.prefix(),
        safe_id,
        date.format("%Y-%m-%d"),
        kind.extension()
    )
}

/// Today's UTC date, the only wall-clock input to an export
pub fn export_date() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// A written export artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub filename: String,
    pub path: PathBuf,
}

/// Write a workbook into `dir` under its dated export filename
pub fn write_workbook(
    dir: &Path,
    kind: ExportKind,
    requirement_id: &str,
    date: NaiveDate,
    workbook: &Workbook,
) -> Result<ExportedFile, ReportError> {
    let filename = export_filename(kind, requirement_id, date);
    let path = dir.join(&filename);
    xlsx::write(workbook, &path)?;
    Ok(ExportedFile { filename, path })
}

/// Write the raw JSON export into `dir` under its dated export filename
pub fn write_raw(
    dir: &Path,
    requirement_id: &str,
    date: NaiveDate,
    export: &RawExport,
) -> Result<ExportedFile, ReportError> {
    let filename = export_filename(ExportKind::RawJson, requirement_id, date);
    let path = dir.join(&filename);
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, export.to_json()?)?;
    log::info!("Wrote raw export {}", path.display());
    Ok(ExportedFile { filename, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_filenames() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            export_filename(ExportKind::TestCases, "REQ-001", date),
            "test_cases_REQ-001_2024-03-09.xlsx"
        );
        assert_eq!(
            export_filename(ExportKind::SelectedTestCases, "REQ-001", date),
            "selected_test_cases_REQ-001_2024-03-09.xlsx"
        );
        assert_eq!(
            export_filename(ExportKind::CoverageReport, "REQ-001", date),
            "coverage_report_REQ-001_2024-03-09.xlsx"
        );
        assert_eq!(
            export_filename(ExportKind::RawJson, "REQ-001", date),
            "raw_export_REQ-001_2024-03-09.json"
        );
    }

    #[test]
    fn test_export_filename_sanitizes_id() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            export_filename(ExportKind::TestCases, "SYS/REQ 7", date),
            "test_cases_SYS_REQ_7_2024-01-01.xlsx"
        );
        assert_eq!(
            export_filename(ExportKind::RawJson, "", date),
            "raw_export_requirement_2024-01-01.json"
        );
    }
}
