//! Spreadsheet writer
//!
//! Rows are any `Serialize` type that serializes to a JSON object. Columns
//! follow field order (first appearance across all rows) and headers can be
//! renamed.

use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use super::ReportError;

/// `(field, header)` pair
pub type ColumnRename = (&'static str, &'static str);

const COLUMN_WIDTH: f64 = 14.0;

/// Write `records` to a single-sheet workbook at `path`
///
/// Returns the number of data rows written. Null fields leave the cell empty.
pub fn write_records<T: Serialize>(
    path: &Path,
    sheet_name: &str,
    records: &[T],
    renames: &[ColumnRename],
) -> Result<usize, ReportError> {
    let rows = records
        .iter()
        .map(|record| {
            serde_json::to_value(record).map(|value| match value {
                Value::Object(map) => map,
                other => std::iter::once(("value".to_string(), other)).collect(),
            })
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, key) in columns.iter().enumerate() {
        let col = col as u16;
        let header = renames
            .iter()
            .find(|(field, _)| *field == key.as_str())
            .map_or(key.as_str(), |(_, header)| *header);
        worksheet.write_string_with_format(0, col, header, &header_format)?;
        worksheet.set_column_width(col, COLUMN_WIDTH)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let line = idx as u32 + 1;
        for (col, key) in columns.iter().enumerate() {
            let col = col as u16;
            match row.get(key) {
                Some(Value::String(s)) => {
                    worksheet.write_string(line, col, s)?;
                }
                Some(Value::Number(n)) => {
                    if let Some(f) = n.as_f64() {
                        worksheet.write_number(line, col, f)?;
                    }
                }
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(line, col, *b)?;
                }
                Some(other @ (Value::Array(_) | Value::Object(_))) => {
                    worksheet.write_string(line, col, other.to_string())?;
                }
                Some(Value::Null) | None => {}
            }
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    workbook.save(path)?;

    tracing::debug!(path = %path.display(), rows = rows.len(), "Spreadsheet written");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        employee_no: &'static str,
        employee_name: Option<&'static str>,
        late_minutes: u32,
    }

    #[test]
    fn test_writes_workbook_with_renamed_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.xlsx");
        let rows = vec![
            Row { employee_no: "E001", employee_name: Some("윤서현"), late_minutes: 5 },
            Row { employee_no: "E002", employee_name: None, late_minutes: 0 },
        ];

        let written = write_records(
            &path,
            "출결현황",
            &rows,
            &[("employeeNo", "사번"), ("employeeName", "이름")],
        )
        .unwrap();

        assert_eq!(written, 2);
        let bytes = std::fs::read(&path).unwrap();
        // xlsx files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_input_still_writes_a_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        let rows: Vec<Row> = Vec::new();

        assert_eq!(write_records(&path, "출결현황", &rows, &[]).unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_invalid_sheet_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xlsx");
        let rows: Vec<Row> = Vec::new();

        let err = write_records(&path, "bad/name", &rows, &[]).unwrap_err();
        assert!(matches!(err, ReportError::Xlsx(_)));
    }
}
