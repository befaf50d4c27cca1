// Spreadsheet serialization for export workbooks

use super::{Cell, ReportError, Workbook};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format};
use std::path::Path;

/// Creation date stamped into every document so file bodies do not carry
/// the export time
const DOCUMENT_EPOCH: (u16, u8, u8) = (2000, 1, 1);

fn to_xlsx(workbook: &Workbook) -> Result<rust_xlsxwriter::Workbook, ReportError> {
    let mut book = rust_xlsxwriter::Workbook::new();

    let (year, month, day) = DOCUMENT_EPOCH;
    let created = ExcelDateTime::from_ymd(year, month, day)?;
    let properties = DocProperties::new()
        .set_author("testcase-workbench")
        .set_creation_datetime(&created);
    book.set_properties(&properties);

    let header = Format::new().set_bold();

    for sheet in &workbook.sheets {
        let worksheet = book.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (col, column) in sheet.columns.iter().enumerate() {
            let col = col as u16;
            worksheet.set_column_width(col, column.width)?;
            worksheet.write_string_with_format(0, col, &column.header, &header)?;
        }

        for (row_index, row) in sheet.rows.iter().enumerate() {
            let row_num = (row_index + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(text) => {
                        worksheet.write_string(row_num, col, text)?;
                    }
                    Cell::Number(value) => {
                        worksheet.write_number(row_num, col, *value)?;
                    }
                }
            }
        }
    }

    Ok(book)
}

/// Serialize a workbook to `.xlsx` bytes
pub fn to_bytes(workbook: &Workbook) -> Result<Vec<u8>, ReportError> {
    let mut book = to_xlsx(workbook)?;
    Ok(book.save_to_buffer()?)
}

/// Write a workbook to `path` as `.xlsx`
pub fn write(workbook: &Workbook, path: &Path) -> Result<(), ReportError> {
    let bytes = to_bytes(workbook)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    log::info!("Wrote workbook {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Column, Sheet};
    use tempfile::TempDir;

    fn workbook() -> Workbook {
        let mut sheet = Sheet::new("REQ-1", vec![Column::new("Metric", 25.0)]);
        sheet.push_row(vec![Cell::text("Total Rules")]);
        sheet.push_row(vec![Cell::count(3)]);
        Workbook {
            sheets: vec![sheet],
        }
    }

    #[test]
    fn test_write_creates_zip_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.xlsx");
        write(&workbook(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_invalid_sheet_name_surfaces_error() {
        let mut book = workbook();
        book.sheets[0].name = "bad[name]".to_string();
        assert!(matches!(to_bytes(&book), Err(ReportError::Xlsx(_))));
    }
}
