//! Entity merge: patch a source table with reference values, keyed by entity id.
//!
//! The merge is update-only. Reference values that are missing never
//! overwrite, reference entities unknown to the source are skipped, and a
//! write only happens (and is flagged) when the new value differs from the
//! old one. Changed rows form the delta.

use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityIndex, Side};
use crate::error::MergeError;
use crate::table::{ColumnId, Table, Value};

/// Suffix of the per-column change flag in annotated output.
pub const CHANGED_SUFFIX: &str = "_changed";
/// Name of the aggregate per-row change flag in annotated output.
pub const ROW_CHANGED: &str = "row_changed";

pub const DEFAULT_ID_COLUMN: &str = "Supplier ID";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    #[serde(default = "default_id_column")]
    pub id_column: String,
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            id_column: default_id_column(),
        }
    }
}

impl MergeOptions {
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Skips
// ---------------------------------------------------------------------------

/// Why an input row took no part in a merge or load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    MissingId,
    NonNumericId { raw: String },
    UnknownEntity { id: EntityId },
    TooManyFields { expected: usize, found: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingId => f.write_str("missing entity id"),
            SkipReason::NonNumericId { raw } => write!(f, "non-numeric entity id '{raw}'"),
            SkipReason::UnknownEntity { id } => write!(f, "entity {id} not in source"),
            SkipReason::TooManyFields { expected, found } => {
                write!(f, "{found} fields, header has {expected}")
            }
        }
    }
}

/// A skipped row, by 0-based data row index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSkip {
    pub row: usize,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl fmt::Display for RowSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.reason)
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnFlips {
    pub column: String,
    pub flips: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub source_rows: usize,
    /// Source rows without an id; kept but never updated.
    pub unaddressable_source_rows: usize,
    pub reference_rows: usize,
    /// Reference rows left after dropping missing and non-numeric ids.
    pub reference_rows_kept: usize,
    pub applied_rows: usize,
    pub changed_rows: usize,
    pub flips: Vec<ColumnFlips>,
    pub skipped: Vec<RowSkip>,
}

#[derive(Debug, Clone)]
struct ComparedColumn {
    name: String,
    source: ColumnId,
    reference: ColumnId,
}

/// Merged table plus per-cell change flags.
#[derive(Debug, Clone)]
pub struct MergeResult {
    table: Table,
    compared: Vec<ComparedColumn>,
    /// One row of flags per table row, parallel to `compared`.
    flags: Vec<Vec<bool>>,
    report: MergeReport,
}

impl MergeResult {
    /// The full source table with reference values applied.
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn report(&self) -> &MergeReport {
        &self.report
    }

    /// Columns compared between the two tables, in source order.
    pub fn compared_columns(&self) -> impl Iterator<Item = &str> {
        self.compared.iter().map(|c| c.name.as_str())
    }

    pub fn is_changed(&self, row: usize, column: &str) -> bool {
        let Some(pos) = self.compared.iter().position(|c| c.name == column) else {
            return false;
        };
        self.flags.get(row).map_or(false, |f| f[pos])
    }

    pub fn row_changed(&self, row: usize) -> bool {
        self.flags.get(row).map_or(false, |f| f.iter().any(|&b| b))
    }

    /// Indices of changed rows, ascending.
    pub fn changed_rows(&self) -> Vec<usize> {
        (0..self.flags.len()).filter(|&r| self.row_changed(r)).collect()
    }

    pub fn flip_counts(&self) -> &[ColumnFlips] {
        &self.report.flips
    }

    /// Changed rows only, without flag columns.
    pub fn delta(&self) -> Table {
        self.table.take_rows(&self.changed_rows())
    }

    /// Full table with a `<column>_changed` flag per compared column and a
    /// trailing `row_changed` flag.
    pub fn annotated(&self) -> Result<Table, MergeError> {
        let mut table = self.table.clone();
        for (pos, column) in self.compared.iter().enumerate() {
            let values = self.flags.iter().map(|f| Value::Bool(f[pos])).collect();
            table.push_column(format!("{}{}", column.name, CHANGED_SUFFIX), values)?;
        }
        let rows = (0..self.flags.len())
            .map(|r| Value::Bool(self.row_changed(r)))
            .collect();
        table.push_column(ROW_CHANGED, rows)?;
        Ok(table)
    }

    /// Changed rows only, with flag columns.
    pub fn annotated_delta(&self) -> Result<Table, MergeError> {
        Ok(self.annotated()?.take_rows(&self.changed_rows()))
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge `reference` into `source`.
///
/// Both tables must carry `options.id_column`. Ids repeating within either
/// table abort the merge; so does a missing id column.
pub fn merge(
    mut source: Table,
    reference: &Table,
    options: &MergeOptions,
) -> Result<MergeResult, MergeError> {
    let id_column = options.id_column.as_str();
    let source_id = id_column_of(&source, Side::Source, id_column)?;
    let reference_id = id_column_of(reference, Side::Reference, id_column)?;

    let mut report = MergeReport {
        source_rows: source.len(),
        reference_rows: reference.len(),
        ..MergeReport::default()
    };

    // Canonical ids are written back so output ids carry no `.0` artifact.
    let mut source_entries = Vec::with_capacity(source.len());
    for row in 0..source.len() {
        let canonical = source.get(row, source_id).and_then(EntityId::canonicalize);
        match canonical {
            Some(id) => {
                source.set(row, source_id, Value::Text(id.as_str().to_string()));
                source_entries.push((row, id));
            }
            None => report.unaddressable_source_rows += 1,
        }
    }
    let source_index = EntityIndex::build(Side::Source, source_entries)?;

    let mut reference_entries = Vec::with_capacity(reference.len());
    for row in 0..reference.len() {
        let raw = reference.get(row, reference_id).cloned().unwrap_or(Value::Missing);
        match EntityId::canonicalize(&raw) {
            None => report.skipped.push(RowSkip {
                row,
                reason: SkipReason::MissingId,
            }),
            Some(id) if !id.is_numeric() => report.skipped.push(RowSkip {
                row,
                reason: SkipReason::NonNumericId { raw: raw.render() },
            }),
            Some(id) => reference_entries.push((row, id)),
        }
    }
    report.reference_rows_kept = reference_entries.len();
    // Uniqueness check only; the lookup direction is reference → source.
    EntityIndex::build(Side::Reference, reference_entries.iter().cloned())?;

    let compared: Vec<ComparedColumn> = source
        .schema()
        .iter()
        .filter(|(_, name)| *name != id_column)
        .filter_map(|(id, name)| {
            reference.schema().column(name).map(|r| ComparedColumn {
                name: name.to_string(),
                source: id,
                reference: r,
            })
        })
        .collect();
    debug!(
        "merging on '{id_column}', comparing {} columns: {:?}",
        compared.len(),
        compared.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );

    let mut flags = vec![vec![false; compared.len()]; source.len()];
    let mut flips = vec![0usize; compared.len()];

    for (ref_row, id) in reference_entries {
        let Some(src_row) = source_index.get(&id) else {
            debug!("reference row {ref_row}: entity {id} not in source");
            report.skipped.push(RowSkip {
                row: ref_row,
                reason: SkipReason::UnknownEntity { id },
            });
            continue;
        };
        report.applied_rows += 1;

        for (pos, column) in compared.iter().enumerate() {
            let new = match reference.get(ref_row, column.reference) {
                Some(v) if !v.is_missing() => v,
                _ => continue,
            };
            let unchanged = source
                .get(src_row, column.source)
                .map_or(false, |old| new.same_as(old));
            if unchanged {
                continue;
            }
            debug!(
                "entity {id}: '{}' {} -> {}",
                column.name,
                source.get(src_row, column.source).map(Value::render).unwrap_or_default(),
                new.render()
            );
            source.set(src_row, column.source, new.clone());
            flags[src_row][pos] = true;
            flips[pos] += 1;
        }
    }

    report.changed_rows = flags.iter().filter(|f| f.iter().any(|&b| b)).count();
    report.flips = compared
        .iter()
        .zip(&flips)
        .map(|(c, &n)| ColumnFlips {
            column: c.name.clone(),
            flips: n,
        })
        .collect();

    info!(
        "merge: {} source rows, {} of {} reference rows kept, {} applied, {} changed",
        report.source_rows,
        report.reference_rows_kept,
        report.reference_rows,
        report.applied_rows,
        report.changed_rows
    );

    Ok(MergeResult {
        table: source,
        compared,
        flags,
        report,
    })
}

fn id_column_of(table: &Table, side: Side, column: &str) -> Result<ColumnId, MergeError> {
    table
        .schema()
        .column(column)
        .ok_or_else(|| MergeError::MissingIdColumn {
            side,
            column: column.to_string(),
        })
}
