use std::path::PathBuf;

use crosswalk_recon::ReconError;
use thiserror::Error;

/// Failures locating an input.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid source '{}': not a file or directory", .0.display())]
    InvalidSource(PathBuf),
    #[error("no {} file found under '{}'", .extensions.join("/"), .dir.display())]
    NotFound {
        dir: PathBuf,
        extensions: Vec<String>,
    },
}

/// Failures reading or writing tabular files.
#[derive(Debug, Error)]
pub enum IoError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write '{}': {message}", .path.display())]
    Write { path: PathBuf, message: String },
    #[error("malformed '{}': {message}", .path.display())]
    Malformed { path: PathBuf, message: String },
    #[error("unsupported file type '{}'", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("'{}' has {rows} rows, no header at row {header_row}", .path.display())]
    MissingHeader {
        path: PathBuf,
        header_row: usize,
        rows: usize,
    },
    #[error(transparent)]
    Schema(#[from] ReconError),
}

impl IoError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        IoError::Write {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        IoError::Malformed {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Failures talking to the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("table '{0}' does not exist")]
    MissingTable(String),
    #[error("table '{table}' has no '{column}' column")]
    MissingColumn { table: String, column: String },
}
