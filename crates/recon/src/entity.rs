//! Entity identifiers and the one-row-per-entity index.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::MergeError;
use crate::table::Value;

/// Which input table a row or column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Reference,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Reference => f.write_str("reference"),
        }
    }
}

/// Canonical entity identifier: trimmed text with a trailing `.0` removed.
///
/// Spreadsheet tools routinely turn `12345` into `12345.0`; both forms
/// canonicalize to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// `None` for missing or blank values.
    pub fn canonicalize(value: &Value) -> Option<EntityId> {
        if value.is_missing() {
            return None;
        }
        Self::parse(&value.render())
    }

    pub fn parse(raw: &str) -> Option<EntityId> {
        let trimmed = raw.trim();
        let id = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        if id.is_empty() {
            None
        } else {
            Some(EntityId(id.to_string()))
        }
    }

    /// Purely ASCII digits.
    pub fn is_numeric(&self) -> bool {
        self.0.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An id that occurs on more than one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateEntity {
    pub id: EntityId,
    pub rows: Vec<usize>,
}

impl fmt::Display for DuplicateEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = self.rows.iter().map(|r| r.to_string()).collect();
        write!(f, "{} (rows {})", self.id, rows.join(", "))
    }
}

/// Entity id → row. Building it fails if any id repeats.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    rows: HashMap<EntityId, usize>,
}

impl EntityIndex {
    pub fn build<I>(side: Side, entries: I) -> Result<Self, MergeError>
    where
        I: IntoIterator<Item = (usize, EntityId)>,
    {
        let mut rows: HashMap<EntityId, usize> = HashMap::new();
        let mut repeats: HashMap<EntityId, Vec<usize>> = HashMap::new();
        let mut repeat_order: Vec<EntityId> = Vec::new();

        for (row, id) in entries {
            match rows.get(&id) {
                Some(&first) => {
                    let seen = repeats.entry(id.clone()).or_insert_with(|| {
                        repeat_order.push(id.clone());
                        vec![first]
                    });
                    seen.push(row);
                }
                None => {
                    rows.insert(id, row);
                }
            }
        }

        if repeat_order.is_empty() {
            return Ok(Self { rows });
        }

        let duplicates = repeat_order
            .into_iter()
            .map(|id| {
                let rows = repeats.remove(&id).unwrap_or_default();
                DuplicateEntity { id, rows }
            })
            .collect();
        Err(MergeError::DuplicateEntities { side, duplicates })
    }

    pub fn get(&self, id: &EntityId) -> Option<usize> {
        self.rows.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::parse(s).unwrap()
    }

    #[test]
    fn trailing_decimal_zero_removed() {
        assert_eq!(id("12345.0"), id("12345"));
        assert_eq!(id(" 100.0 ").as_str(), "100");
        assert_eq!(EntityId::canonicalize(&Value::Number(12345.0)), Some(id("12345")));
        assert_eq!(EntityId::canonicalize(&Value::text("12345.0")), Some(id("12345")));
    }

    #[test]
    fn only_one_suffix_stripped() {
        assert_eq!(id("10.0.0").as_str(), "10.0");
        assert!(!id("10.0.0").is_numeric());
        assert_eq!(id("1.5").as_str(), "1.5");
    }

    #[test]
    fn blank_is_none() {
        assert_eq!(EntityId::parse("  "), None);
        assert_eq!(EntityId::canonicalize(&Value::Missing), None);
        assert_eq!(EntityId::canonicalize(&Value::Number(f64::NAN)), None);
    }

    #[test]
    fn numeric_check() {
        assert!(id("00123").is_numeric());
        assert!(!id("ABC-1").is_numeric());
        assert!(!id("-5").is_numeric());
    }

    #[test]
    fn index_rejects_duplicates() {
        let entries = vec![(0, id("1")), (1, id("2")), (2, id("1.0")), (3, id("1"))];
        let err = EntityIndex::build(Side::Source, entries).unwrap_err();
        match err {
            MergeError::DuplicateEntities { side, duplicates } => {
                assert_eq!(side, Side::Source);
                assert_eq!(duplicates.len(), 1);
                assert_eq!(duplicates[0].rows, vec![0, 2, 3]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn index_lookup() {
        let index = EntityIndex::build(Side::Reference, vec![(4, id("7")), (9, id("8"))]).unwrap();
        assert_eq!(index.get(&id("8")), Some(9));
        assert_eq!(index.get(&id("9")), None);
        assert_eq!(index.len(), 2);
    }
}
