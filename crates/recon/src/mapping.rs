//! Column mapping: normalized external header → canonical (target) header.
//!
//! Entry order is preserved so a persisted mapping reads back exactly as it
//! was produced. Targets may be shared: several external headers can map to
//! one canonical name. Applied to a table, the first column in load order that
//! claims a name keeps it and every later claimant is dropped.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::ReconError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub external: String,
    pub target: String,
}

/// Ordered external → target mapping with unique keys. Targets need not be unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<MappingEntry>,
    index: HashMap<String, usize>,
}

/// A column that lost its canonical name to an earlier column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedColumn {
    pub column: String,
    pub target: String,
    pub kept: String,
}

impl fmt::Display for DroppedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column == self.target {
            write!(f, "column '{}' dropped: '{}' maps onto it", self.column, self.kept)
        } else {
            write!(
                f,
                "column '{}' dropped: '{}' already comes from '{}'",
                self.column, self.target, self.kept
            )
        }
    }
}

/// Canonical names for a run of input columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// One slot per input column: the canonical name, or `None` when dropped.
    pub names: Vec<Option<String>>,
    pub dropped: Vec<DroppedColumn>,
}

/// On-disk form: one `[[column]]` table per entry.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MappingDocument {
    #[serde(default, rename = "column")]
    columns: Vec<MappingEntry>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries, rejecting a repeated external header.
    pub fn from_entries(entries: Vec<MappingEntry>) -> Result<Self, ReconError> {
        let mut mapping = ColumnMapping::new();
        for entry in entries {
            if !mapping.insert(&entry.external, &entry.target) {
                return Err(ReconError::Mapping(format!(
                    "external header '{}' is mapped more than once",
                    entry.external
                )));
            }
        }
        Ok(mapping)
    }

    /// Insert a new entry. Returns `false` (and changes nothing) if the key exists.
    pub fn insert(&mut self, external: impl Into<String>, target: impl Into<String>) -> bool {
        let external = external.into();
        if self.index.contains_key(&external) {
            return false;
        }
        self.index.insert(external.clone(), self.entries.len());
        self.entries.push(MappingEntry {
            external,
            target: target.into(),
        });
        true
    }

    pub fn get(&self, external: &str) -> Option<&str> {
        self.index
            .get(external)
            .map(|&i| self.entries[i].target.as_str())
    }

    pub fn contains_key(&self, external: &str) -> bool {
        self.index.contains_key(external)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn externals(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.external.as_str())
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.target.as_str())
    }

    /// Resolve input columns, in load order, to canonical names. Unmapped
    /// columns claim their own name. The first column to claim a name keeps it.
    pub fn resolve<S: AsRef<str>>(&self, columns: &[S]) -> Resolution {
        let mut claimed: HashMap<&str, &str> = HashMap::new();
        let mut resolution = Resolution::default();
        for column in columns {
            let column = column.as_ref();
            let name = self.get(column).unwrap_or(column);
            match claimed.get(name) {
                Some(kept) => {
                    resolution.names.push(None);
                    resolution.dropped.push(DroppedColumn {
                        column: column.to_string(),
                        target: name.to_string(),
                        kept: kept.to_string(),
                    });
                }
                None => {
                    claimed.insert(name, column);
                    resolution.names.push(Some(name.to_string()));
                }
            }
        }
        resolution
    }

    /// Target → external for an input with the given columns.
    ///
    /// A shared target reverses to the column `resolve` keeps for it, so a
    /// store update reads the same column a merge would. Targets whose
    /// externals are all absent from the input reverse to their first entry.
    pub fn reverse<S: AsRef<str>>(&self, columns: &[S]) -> HashMap<String, String> {
        let mut reverse = HashMap::new();
        let mut resolved: HashSet<String> = HashSet::new();
        let resolution = self.resolve(columns);
        for (column, name) in columns.iter().zip(&resolution.names) {
            let Some(name) = name else { continue };
            resolved.insert(name.clone());
            if self.contains_key(column.as_ref()) {
                reverse.insert(name.clone(), column.as_ref().to_string());
            }
        }
        for entry in &self.entries {
            if !resolved.contains(&entry.target) {
                reverse
                    .entry(entry.target.clone())
                    .or_insert_with(|| entry.external.clone());
            }
        }
        reverse
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        let doc = MappingDocument {
            columns: self.entries.clone(),
        };
        toml::to_string(&doc).map_err(|e| ReconError::Mapping(e.to_string()))
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let doc: MappingDocument =
            toml::from_str(input).map_err(|e| ReconError::Mapping(e.to_string()))?;
        Self::from_entries(doc.columns)
    }
}

impl Serialize for ColumnMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}
