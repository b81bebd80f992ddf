use thiserror::Error;

use crate::entity::{DuplicateEntity, Side};

/// Structural errors raised by the schema and configuration layer.
///
/// Row-level conditions (unmatched headers, skipped entities) are never
/// reported through this type; they are accumulated into reports instead.
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad threshold, conflicting mapping, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Mapping document could not be parsed or serialized.
    #[error("mapping error: {0}")]
    Mapping(String),
    /// Two columns resolve to the same name within one schema.
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
    /// A required column is absent from a table.
    #[error("missing column '{0}'")]
    MissingColumn(String),
    /// A row does not have one value per schema column.
    #[error("row {row}: expected {expected} values, found {found}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Structural failures of an entity merge. Either of these aborts the merge
/// before any value is written.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("{side} table has no '{column}' column")]
    MissingIdColumn { side: Side, column: String },
    #[error("{side} table has duplicate entity ids: {}", list_duplicates(.duplicates))]
    DuplicateEntities {
        side: Side,
        duplicates: Vec<DuplicateEntity>,
    },
    #[error(transparent)]
    Schema(#[from] ReconError),
}

fn list_duplicates(duplicates: &[DuplicateEntity]) -> String {
    duplicates
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
