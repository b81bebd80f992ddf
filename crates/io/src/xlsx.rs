// Excel import (first sheet of xlsx/xlsm/xls/ods) and delta export (xlsx only)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use crosswalk_recon::{Table, Value};
use log::debug;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::IoError;

/// Read the first sheet into a grid. Cells are placed at their physical
/// positions, so leading blank rows and columns are kept.
pub fn read_grid(path: &Path) -> Result<Vec<Vec<Value>>, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| IoError::malformed(path, format!("failed to open Excel file: {e}")))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IoError::malformed(path, "Excel file contains no sheets"))?;
    debug!("reading sheet '{first}' of '{}'", path.display());

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| IoError::malformed(path, format!("failed to read sheet '{first}': {e}")))?;

    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<Value>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut values = vec![Value::Missing; start_col as usize];
        values.extend(row.iter().map(cell_value));
        grid.push(values);
    }
    Ok(grid)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Missing,
        Data::String(s) => Value::text(s.as_str()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        // Error cells carry no usable value.
        Data::Error(_) => Value::Missing,
        Data::DateTime(dt) => serial_to_iso(dt.as_f64())
            .map(Value::Text)
            .unwrap_or(Value::Number(dt.as_f64())),
        Data::DateTimeIso(s) => Value::text(s.as_str()),
        Data::DurationIso(s) => Value::text(s.as_str()),
    }
}

/// Excel 1900-system serial → `YYYY-MM-DD` (with ` HH:MM:SS` when a time part is present).
fn serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() || !(0.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let dt = base.checked_add_signed(Duration::milliseconds(millis))?;
    if serial.fract().abs() < 1e-9 {
        Some(dt.format("%Y-%m-%d").to_string())
    } else {
        Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

/// Write a table to a single-sheet workbook with a bold header row.
pub fn write_table(table: &Table, path: &Path) -> Result<(), IoError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, name) in table.schema().names().iter().enumerate() {
        worksheet
            .write_string_with_format(0, cell_col(col, path)?, name, &header)
            .map_err(|e| IoError::write(path, e))?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let row_idx = u32::try_from(r + 1)
            .map_err(|_| IoError::write(path, format!("row {} is past the worksheet limit", r + 1)))?;
        for (c, value) in row.iter().enumerate() {
            let col = cell_col(c, path)?;
            let written = match value {
                Value::Missing => continue,
                Value::Text(s) => worksheet.write_string(row_idx, col, s),
                Value::Number(n) if n.is_finite() => worksheet.write_number(row_idx, col, *n),
                Value::Number(_) => continue,
                Value::Bool(b) => worksheet.write_boolean(row_idx, col, *b),
            };
            written.map_err(|e| IoError::write(path, e))?;
        }
    }

    workbook.save(path).map_err(|e| IoError::write(path, e))?;
    Ok(())
}

fn cell_col(col: usize, path: &Path) -> Result<u16, IoError> {
    u16::try_from(col).map_err(|_| IoError::write(path, format!("column {col} is past the worksheet limit")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosswalk_recon::Schema;
    use tempfile::tempdir;

    #[test]
    fn test_serial_to_iso() {
        assert_eq!(serial_to_iso(45292.0).as_deref(), Some("2024-01-01"));
        assert_eq!(serial_to_iso(45292.5).as_deref(), Some("2024-01-01 12:00:00"));
        assert_eq!(serial_to_iso(-1.0), None);
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("delta.xlsx");
        let table = Table::from_rows(
            Schema::new(["Supplier ID", "Status", "Amount", "row_changed"]).unwrap(),
            vec![
                vec![Value::text("100"), Value::text("Approved"), Value::Number(12.5), Value::Bool(true)],
                vec![Value::text("200"), Value::Missing, Value::Number(3.0), Value::Bool(false)],
            ],
        )
        .unwrap();
        write_table(&table, &path).unwrap();

        let grid = read_grid(&path).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0][0], Value::text("Supplier ID"));
        assert_eq!(grid[1][1], Value::text("Approved"));
        assert_eq!(grid[1][2], Value::Number(12.5));
        assert_eq!(grid[1][3], Value::Bool(true));
        assert_eq!(grid[2][1], Value::Missing);
    }

    #[test]
    fn test_column_index_out_of_range() {
        let path = Path::new("wide.xlsx");
        assert_eq!(cell_col(3, path).unwrap(), 3);
        assert_eq!(cell_col(65_535, path).unwrap(), u16::MAX);
        let err = cell_col(65_536, path).unwrap_err();
        assert!(matches!(err, IoError::Write { .. }));
        assert!(err.to_string().contains("column 65536"), "{err}");
    }

    #[test]
    fn test_missing_file_is_malformed() {
        let dir = tempdir().unwrap();
        let err = read_grid(&dir.path().join("absent.xlsx")).unwrap_err();
        assert!(matches!(err, IoError::Malformed { .. }));
    }
}
