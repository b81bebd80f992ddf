//! Store update batch: push an exported table into a relational store, one
//! UPDATE per entity, collecting per-entity failures instead of aborting.

use std::collections::HashMap;
use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;

use crate::entity::EntityId;
use crate::merge::{RowSkip, SkipReason};
use crate::table::{ColumnId, Schema, Table, Value};

/// Column-name fragments marking money/voucher columns that get numeric coercion.
pub const DEFAULT_NUMERIC_MARKERS: &[&str] = &["Amount", "Vchr"];

/// Keep only digits and `.`, then parse. Anything unparsable becomes missing.
pub fn coerce_numeric(value: &Value) -> Value {
    match value {
        Value::Number(n) if !n.is_nan() => Value::Number(*n),
        Value::Missing | Value::Number(_) => Value::Missing,
        other => {
            let digits: String = other
                .render()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or(Value::Missing)
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedColumn {
    pub store_column: String,
    pub input_column: String,
    pub numeric: bool,
}

/// Which input column feeds which store column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePlan {
    pub store_id_column: String,
    pub input_id_column: String,
    pub columns: Vec<PlannedColumn>,
}

/// Build the plan from the store's columns and a target → external reverse mapping.
///
/// A store column is updated only when the reverse mapping names an external
/// column for it and the input actually carries that column. The input id
/// column is the reverse-mapped store id column, or the same name when unmapped.
pub fn plan_updates(
    store_columns: &[String],
    store_id_column: &str,
    reverse: &HashMap<String, String>,
    input: &Schema,
    numeric_markers: &[String],
) -> UpdatePlan {
    let input_id_column = reverse
        .get(store_id_column)
        .cloned()
        .unwrap_or_else(|| store_id_column.to_string());

    let mut columns = Vec::new();
    for store_column in store_columns {
        if store_column == store_id_column {
            continue;
        }
        let Some(input_column) = reverse.get(store_column) else {
            continue;
        };
        if !input.contains(input_column) {
            debug!("store column '{store_column}': input has no '{input_column}' column");
            continue;
        }
        columns.push(PlannedColumn {
            store_column: store_column.clone(),
            input_column: input_column.clone(),
            numeric: numeric_markers.iter().any(|m| store_column.contains(m.as_str())),
        });
    }

    UpdatePlan {
        store_id_column: store_id_column.to_string(),
        input_id_column,
        columns,
    }
}

/// One entity's assignments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreUpdate {
    pub entity_id: EntityId,
    pub assignments: Vec<(String, Value)>,
}

/// Turn input rows into updates. Rows without an id are skipped.
pub fn build_updates(table: &Table, plan: &UpdatePlan) -> (Vec<StoreUpdate>, Vec<RowSkip>) {
    let id_column = table.schema().column(&plan.input_id_column);
    let planned: Vec<(Option<ColumnId>, &PlannedColumn)> = plan
        .columns
        .iter()
        .map(|p| (table.schema().column(&p.input_column), p))
        .collect();

    let mut updates = Vec::with_capacity(table.len());
    let mut skipped = Vec::new();
    for row in 0..table.len() {
        let id = id_column
            .and_then(|c| table.get(row, c))
            .and_then(EntityId::canonicalize);
        let Some(entity_id) = id else {
            skipped.push(RowSkip {
                row,
                reason: SkipReason::MissingId,
            });
            continue;
        };

        let assignments = planned
            .iter()
            .map(|(col, p)| {
                let raw = col
                    .and_then(|c| table.get(row, c))
                    .cloned()
                    .unwrap_or(Value::Missing);
                let value = if p.numeric { coerce_numeric(&raw) } else { raw };
                (p.store_column.clone(), value)
            })
            .collect();
        updates.push(StoreUpdate {
            entity_id,
            assignments,
        });
    }
    (updates, skipped)
}

// ---------------------------------------------------------------------------
// Applying
// ---------------------------------------------------------------------------

/// A relational store that accepts per-entity updates.
pub trait UpdateSink {
    type Error: fmt::Display;

    /// Column names of the target table.
    fn columns(&self) -> Result<Vec<String>, Self::Error>;

    /// Apply one update, returning the number of rows affected.
    fn update(&mut self, update: &StoreUpdate) -> Result<usize, Self::Error>;
}

/// A per-entity failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub entity_id: String,
    pub message: String,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity_id, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub attempted: usize,
    pub applied: usize,
    pub discrepancies: Vec<Discrepancy>,
}

/// Run every update. Failures and updates that hit no row become
/// discrepancies; the batch always runs to the end.
pub fn apply_updates<S: UpdateSink>(sink: &mut S, updates: &[StoreUpdate]) -> UpdateReport {
    let mut report = UpdateReport::default();
    for update in updates {
        report.attempted += 1;
        match sink.update(update) {
            Ok(0) => {
                warn!("entity {}: no matching row in store", update.entity_id);
                report.discrepancies.push(Discrepancy {
                    entity_id: update.entity_id.to_string(),
                    message: "no matching row in store".into(),
                });
            }
            Ok(_) => report.applied += 1,
            Err(e) => {
                warn!("entity {}: update failed: {e}", update.entity_id);
                report.discrepancies.push(Discrepancy {
                    entity_id: update.entity_id.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
    info!(
        "store update: {} attempted, {} applied, {} discrepancies",
        report.attempted,
        report.applied,
        report.discrepancies.len()
    );
    report
}
