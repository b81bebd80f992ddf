//! Turning a located file into a [`Table`].

use std::path::{Path, PathBuf};

use crosswalk_recon::config::InputConfig;
use crosswalk_recon::{ReconError, RowSkip, Schema, SkipReason, Table, Value};
use log::{debug, info, warn};
use thiserror::Error;

use crate::error::IoError;
use crate::source::{has_extension, locate};
use crate::{csv, xlsx};

const EXCEL_EXTENSIONS: &[&str] = &[".xlsx", ".xlsm", ".xls", ".xlsb", ".ods"];

/// How to cut a table out of a raw grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Physical rows dropped first.
    pub skip_rows: usize,
    /// Header row, counted after `skip_rows`.
    pub header_row: usize,
    /// Text delimiter; sniffed when `None`.
    pub delimiter: Option<u8>,
    /// Keep only these columns when non-empty.
    pub keep_columns: Vec<String>,
    pub drop_columns: Vec<String>,
}

impl From<&InputConfig> for LoadOptions {
    fn from(config: &InputConfig) -> Self {
        Self {
            skip_rows: config.skip_rows,
            header_row: config.header_row,
            delimiter: config.delimiter.and_then(|c| u8::try_from(c).ok()),
            keep_columns: config.keep_columns.clone(),
            drop_columns: config.drop_columns.clone(),
        }
    }
}

/// A loaded table plus the rows that could not be placed in it.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub path: PathBuf,
    pub table: Table,
    pub skipped: Vec<RowSkip>,
}

/// Locate the input described by `config` under `path` and load it.
pub fn load_input(path: &Path, config: &InputConfig) -> Result<Loaded, IoError> {
    let file = locate(path, &config.extensions)?;
    load_table(&file, &LoadOptions::from(config))
}

/// Load a file, choosing the reader by extension. Anything that is not an
/// Excel workbook is read as delimited text.
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<Loaded, IoError> {
    let excel: Vec<String> = EXCEL_EXTENSIONS.iter().map(|s| s.to_string()).collect();
    let grid = if has_extension(path, &excel) {
        xlsx::read_grid(path)?
    } else {
        csv::read_grid(path, options.delimiter)?
    };

    let (table, skipped) = grid_to_table(grid, options).map_err(|e| match e {
        GridError::MissingHeader { rows } => IoError::MissingHeader {
            path: path.to_path_buf(),
            header_row: options.skip_rows + options.header_row,
            rows,
        },
        GridError::Schema(e) => IoError::Schema(e),
    })?;

    for skip in &skipped {
        warn!("{}: skipped {skip}", path.display());
    }
    info!(
        "loaded '{}': {} rows x {} columns",
        path.display(),
        table.len(),
        table.schema().len()
    );
    Ok(Loaded {
        path: path.to_path_buf(),
        table,
        skipped,
    })
}

#[derive(Debug, Error)]
pub enum GridError {
    #[error("grid has {rows} rows, header row is past the end")]
    MissingHeader { rows: usize },
    #[error(transparent)]
    Schema(#[from] ReconError),
}

/// Build a table from raw rows.
///
/// Blank header cells are named `Unnamed: <index>`, repeated names become
/// `X`, `X_1`, … Short rows are padded with missing values; rows with data
/// beyond the header width are skipped and reported. Fully blank rows are
/// dropped.
pub fn grid_to_table(
    grid: Vec<Vec<Value>>,
    options: &LoadOptions,
) -> Result<(Table, Vec<RowSkip>), GridError> {
    let total = grid.len();
    let mut rows = grid.into_iter().skip(options.skip_rows).skip(options.header_row);
    let header = rows.next().ok_or(GridError::MissingHeader { rows: total })?;

    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, v)| match v.render().trim() {
            "" => format!("Unnamed: {i}"),
            name => name.to_string(),
        })
        .collect();
    let schema = Schema::with_unique_names(names);
    let width = schema.len();

    let mut table = Table::new(schema);
    let mut skipped = Vec::new();
    for (index, mut row) in rows.enumerate() {
        if row.iter().all(Value::is_missing) {
            continue;
        }
        if row.len() > width {
            if row[width..].iter().any(|v| !v.is_missing()) {
                skipped.push(RowSkip {
                    row: index,
                    reason: SkipReason::TooManyFields {
                        expected: width,
                        found: row.len(),
                    },
                });
                continue;
            }
            row.truncate(width);
        }
        row.resize(width, Value::Missing);
        table.push_row(row)?;
    }

    if !options.keep_columns.is_empty() {
        for wanted in &options.keep_columns {
            if !table.schema().contains(wanted) {
                warn!("requested column '{wanted}' not present");
            }
        }
        table = table.select(&options.keep_columns);
    }
    if !options.drop_columns.is_empty() {
        table = table.drop_columns(&options.drop_columns);
    }
    debug!("columns: {:?}", table.schema().names());

    Ok((table, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<Value>> {
        rows.iter()
            .map(|r| r.iter().map(|s| Value::text(*s)).collect())
            .collect()
    }

    #[test]
    fn header_after_skipped_rows() {
        let g = grid(&[
            &["Supplier report"],
            &["as of today"],
            &["Supplier ID", "Status"],
            &["1", "a"],
        ]);
        let options = LoadOptions {
            skip_rows: 2,
            ..LoadOptions::default()
        };
        let (table, skipped) = grid_to_table(g, &options).unwrap();
        assert_eq!(table.schema().names(), &["Supplier ID", "Status"]);
        assert_eq!(table.len(), 1);
        assert!(skipped.is_empty());
    }

    #[test]
    fn header_row_counts_after_skip() {
        let g = grid(&[&["x"], &["y"], &["h1", "h2"], &["1", "2"]]);
        let options = LoadOptions {
            skip_rows: 1,
            header_row: 1,
            ..LoadOptions::default()
        };
        let (table, _) = grid_to_table(g, &options).unwrap();
        assert_eq!(table.schema().names(), &["h1", "h2"]);
    }

    #[test]
    fn missing_header_row() {
        let g = grid(&[&["a"]]);
        let options = LoadOptions {
            header_row: 3,
            ..LoadOptions::default()
        };
        assert!(matches!(
            grid_to_table(g, &options).unwrap_err(),
            GridError::MissingHeader { rows: 1 }
        ));
    }

    #[test]
    fn ragged_rows() {
        let g = grid(&[
            &["a", "b", "c"],
            &["1", "2"],
            &["1", "2", "3", "extra"],
            &["4", "5", "6", ""],
            &["", "", ""],
        ]);
        let (table, skipped) = grid_to_table(g, &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_by_name(0, "c"), Some(&Value::Missing));
        assert_eq!(table.get_by_name(1, "c"), Some(&Value::text("6")));
        assert_eq!(
            skipped,
            vec![RowSkip {
                row: 1,
                reason: SkipReason::TooManyFields { expected: 3, found: 4 }
            }]
        );
    }

    #[test]
    fn duplicate_and_blank_headers() {
        let g = grid(&[&["Status", "", "Status"], &["a", "b", "c"]]);
        let (table, _) = grid_to_table(g, &LoadOptions::default()).unwrap();
        assert_eq!(table.schema().names(), &["Status", "Unnamed: 1", "Status_1"]);
    }

    #[test]
    fn keep_and_drop_columns() {
        let g = grid(&[&["a", "b", "c"], &["1", "2", "3"]]);
        let options = LoadOptions {
            keep_columns: vec!["a".into(), "c".into(), "zz".into()],
            drop_columns: vec!["c".into()],
            ..LoadOptions::default()
        };
        let (table, _) = grid_to_table(g, &options).unwrap();
        assert_eq!(table.schema().names(), &["a"]);
    }

    #[test]
    fn load_pipe_file_from_directory() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("export.csv"),
            "Title line\nSupplier ID|Status\n100.0|Pending\n",
        )
        .unwrap();
        let config = InputConfig {
            skip_rows: 1,
            ..InputConfig::default()
        };
        let loaded = load_input(dir.path(), &config).unwrap();
        assert_eq!(loaded.path, dir.path().join("export.csv"));
        assert_eq!(loaded.table.get_by_name(0, "Status"), Some(&Value::text("Pending")));
    }

    #[test]
    fn options_from_config() {
        let config = InputConfig {
            delimiter: Some('|'),
            header_row: 2,
            ..InputConfig::default()
        };
        let options = LoadOptions::from(&config);
        assert_eq!(options.delimiter, Some(b'|'));
        assert_eq!(options.header_row, 2);
    }
}
