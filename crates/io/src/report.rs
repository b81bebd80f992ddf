//! Output sinks: the delta table and one-line-per-item diagnostic files.

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crosswalk_recon::{MergeReport, Table};
use log::info;

use crate::error::IoError;
use crate::source::has_extension;
use crate::{csv, xlsx};

/// Write a table as `.xlsx`, or as comma-delimited text for any other extension.
pub fn write_table(table: &Table, path: &Path) -> Result<(), IoError> {
    if has_extension(path, &[".xlsx".to_string()]) {
        xlsx::write_table(table, path)?;
    } else {
        csv::write_table(table, path, b',')?;
    }
    info!("wrote {} rows to '{}'", table.len(), path.display());
    Ok(())
}

/// One item per line. An empty list still creates the file.
pub fn write_lines<I, T>(path: &Path, items: I) -> Result<usize, IoError>
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let file = File::create(path).map_err(|e| IoError::write(path, e))?;
    let mut out = BufWriter::new(file);
    let mut count = 0;
    for item in items {
        writeln!(out, "{item}").map_err(|e| IoError::write(path, e))?;
        count += 1;
    }
    out.flush().map_err(|e| IoError::write(path, e))?;
    Ok(count)
}

/// Log the run summary the way operators read it.
pub fn log_merge_summary(report: &MergeReport) {
    info!("source rows: {}", report.source_rows);
    info!(
        "reference rows: {} before id filtering, {} after",
        report.reference_rows, report.reference_rows_kept
    );
    info!("delta rows: {}", report.changed_rows);
    for flips in &report.flips {
        info!("  {}: {} changed", flips.column, flips.flips);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosswalk_recon::Value;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn lines_written_one_per_item() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diag.txt");
        let n = write_lines(&path, ["no good match for 'SupplierNm'", "row 3: missing entity id"]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "no good match for 'SupplierNm'\nrow 3: missing entity id\n"
        );
    }

    #[test]
    fn empty_list_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("discrepancies.txt");
        assert_eq!(write_lines(&path, Vec::<String>::new()).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn table_format_follows_extension() {
        let dir = tempdir().unwrap();
        let table = Table::from_records(&["Supplier ID"], vec![vec![Value::text("1")]]).unwrap();

        let csv_path = dir.path().join("delta.csv");
        write_table(&table, &csv_path).unwrap();
        assert_eq!(fs::read_to_string(&csv_path).unwrap(), "Supplier ID\n1\n");

        let xlsx_path = dir.path().join("delta.xlsx");
        write_table(&table, &xlsx_path).unwrap();
        let bytes = fs::read(&xlsx_path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
