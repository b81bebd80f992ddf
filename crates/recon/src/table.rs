//! In-memory tables with a validated column set.
//!
//! Columns are addressed through [`ColumnId`]s handed out by a [`Schema`];
//! name lookups return `None` instead of panicking or inventing columns.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::ReconError;
use crate::mapping::{ColumnMapping, DroppedColumn};

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Missing,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    /// Text value, with empty input treated as missing.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Value::Missing
        } else {
            Value::Text(s)
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Equality after coercion: a number equals text that parses to the same number,
    /// a bool equals text spelling the same bool. Missing equals only missing.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_missing() || b.is_missing() => a.is_missing() && b.is_missing(),
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(n), Value::Text(t)) | (Value::Text(t), Value::Number(n)) => {
                t.trim().parse::<f64>().map(|p| p == *n).unwrap_or(false)
            }
            (Value::Bool(b), Value::Text(t)) | (Value::Text(t), Value::Bool(b)) => {
                t.trim().eq_ignore_ascii_case(if *b { "true" } else { "false" })
            }
            _ => false,
        }
    }

    /// Display form used for keys, CSV output and diagnostics.
    pub fn render(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}

/// Integers without decimals, everything else in shortest round-trip form.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        String::new()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Position of a column within a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(usize);

impl ColumnId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Ordered set of unique column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    names: Vec<String>,
    index: HashMap<String, ColumnId>,
}

impl Schema {
    /// Build a schema, rejecting duplicate names.
    pub fn new<I, S>(names: I) -> Result<Self, ReconError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Schema {
            names: Vec::new(),
            index: HashMap::new(),
        };
        for name in names {
            let name = name.into();
            if schema.index.contains_key(&name) {
                return Err(ReconError::DuplicateColumn(name));
            }
            schema.index.insert(name.clone(), ColumnId(schema.names.len()));
            schema.names.push(name);
        }
        Ok(schema)
    }

    /// Build a schema from raw labels, disambiguating repeats as `X`, `X_1`, `X_2`.
    pub fn with_unique_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Schema {
            names: Vec::new(),
            index: HashMap::new(),
        };
        let mut seen: HashMap<String, usize> = HashMap::new();
        for name in names {
            let base = name.into();
            let mut candidate = base.clone();
            while schema.index.contains_key(&candidate) {
                let n = seen.entry(base.clone()).or_insert(0);
                *n += 1;
                candidate = format!("{base}_{n}");
            }
            schema.index.insert(candidate.clone(), ColumnId(schema.names.len()));
            schema.names.push(candidate);
        }
        schema
    }

    pub fn column(&self, name: &str) -> Option<ColumnId> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn name(&self, id: ColumnId) -> &str {
        &self.names[id.0]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColumnId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (ColumnId(i), n.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Rectangular table: every row carries exactly one value per schema column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self, ReconError> {
        let mut table = Table::new(schema);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Convenience constructor for literal tables.
    pub fn from_records<V: Into<Value>>(
        headers: &[&str],
        records: Vec<Vec<V>>,
    ) -> Result<Self, ReconError> {
        let schema = Schema::new(headers.iter().copied())?;
        let rows = records
            .into_iter()
            .map(|r| r.into_iter().map(Into::into).collect())
            .collect();
        Table::from_rows(schema, rows)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), ReconError> {
        if row.len() != self.schema.len() {
            return Err(ReconError::RowWidth {
                row: self.rows.len(),
                expected: self.schema.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> Option<&[Value]> {
        self.rows.get(row).map(|r| r.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize, col: ColumnId) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col.0))
    }

    /// Lookup by column name. `None` when the row or column does not exist.
    pub fn get_by_name(&self, row: usize, column: &str) -> Option<&Value> {
        self.schema.column(column).and_then(|c| self.get(row, c))
    }

    /// Replace a cell, returning the previous value.
    pub fn set(&mut self, row: usize, col: ColumnId, value: Value) -> Option<Value> {
        self.rows
            .get_mut(row)
            .and_then(|r| r.get_mut(col.0))
            .map(|cell| std::mem::replace(cell, value))
    }

    /// Keep only the named columns that exist, in table order.
    pub fn select(&self, keep: &[String]) -> Table {
        let ids: Vec<ColumnId> = self
            .schema
            .iter()
            .filter(|(_, name)| keep.iter().any(|k| k == name))
            .map(|(id, _)| id)
            .collect();
        self.project(&ids)
    }

    /// Drop the named columns, keeping everything else in order.
    pub fn drop_columns(&self, drop: &[String]) -> Table {
        let ids: Vec<ColumnId> = self
            .schema
            .iter()
            .filter(|(_, name)| !drop.iter().any(|d| d == name))
            .map(|(id, _)| id)
            .collect();
        self.project(&ids)
    }

    fn project(&self, ids: &[ColumnId]) -> Table {
        let schema = Schema {
            names: ids.iter().map(|id| self.schema.name(*id).to_string()).collect(),
            index: ids
                .iter()
                .enumerate()
                .map(|(i, id)| (self.schema.name(*id).to_string(), ColumnId(i)))
                .collect(),
        };
        let rows = self
            .rows
            .iter()
            .map(|r| ids.iter().map(|id| r[id.0].clone()).collect())
            .collect();
        Table { schema, rows }
    }

    /// Rename columns through `mapping` (external name → canonical name).
    ///
    /// Columns without an entry keep their name. When several columns land on
    /// one name, the first in load order keeps it and the rest are dropped
    /// and returned.
    pub fn rename(self, mapping: &ColumnMapping) -> (Table, Vec<DroppedColumn>) {
        let resolution = mapping.resolve(self.schema.names.as_slice());
        let kept: Vec<usize> = resolution
            .names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| name.as_ref().map(|_| i))
            .collect();
        let names: Vec<String> = resolution.names.into_iter().flatten().collect();
        let schema = Schema {
            index: names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), ColumnId(i)))
                .collect(),
            names,
        };
        let rows = if kept.len() == self.schema.names.len() {
            self.rows
        } else {
            self.rows
                .into_iter()
                .map(|row| kept.iter().map(|&i| row[i].clone()).collect())
                .collect()
        };
        (Table { schema, rows }, resolution.dropped)
    }

    /// Rows at the given indices, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            schema: self.schema.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Append a column. `values` must hold one value per row.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<ColumnId, ReconError> {
        let name = name.into();
        if self.schema.contains(&name) {
            return Err(ReconError::DuplicateColumn(name));
        }
        if values.len() != self.rows.len() {
            return Err(ReconError::RowWidth {
                row: values.len().min(self.rows.len()),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        let id = ColumnId(self.schema.names.len());
        self.schema.index.insert(name.clone(), id);
        self.schema.names.push(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(id)
    }
}
