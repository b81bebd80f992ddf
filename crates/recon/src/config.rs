use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ReconError;
use crate::mapping::{ColumnMapping, MappingEntry};
use crate::matcher::MatcherConfig;
use crate::merge::{MergeOptions, DEFAULT_ID_COLUMN};
use crate::update::DEFAULT_NUMERIC_MARKERS;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CrosswalkConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Target-only columns kept from the source without renaming.
    #[serde(default)]
    pub extra_columns: Vec<String>,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub source: InputConfig,
    #[serde(default)]
    pub reference: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Static crosswalk. When present it replaces live header matching.
    #[serde(default, rename = "column")]
    pub columns: Vec<MappingEntry>,
    #[serde(default)]
    pub store: Option<StoreConfig>,
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Where a table comes from and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputConfig {
    /// File or directory. Directories are searched for the first accepted file.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Physical rows dropped before the header is located.
    #[serde(default)]
    pub skip_rows: usize,
    /// Header row index, counted after `skip_rows`.
    #[serde(default)]
    pub header_row: usize,
    /// Delimiter for text files. Sniffed when absent.
    #[serde(default)]
    pub delimiter: Option<char>,
    /// Keep only these columns (all when empty).
    #[serde(default)]
    pub keep_columns: Vec<String>,
    #[serde(default)]
    pub drop_columns: Vec<String>,
}

pub fn default_extensions() -> Vec<String> {
    [".xlsm", ".xlsx", ".csv"].iter().map(|s| s.to_string()).collect()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            extensions: default_extensions(),
            skip_rows: 0,
            header_row: 0,
            delimiter: None,
            keep_columns: Vec::new(),
            drop_columns: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Delta file; `.xlsx` or `.csv` by extension.
    #[serde(default)]
    pub delta: Option<String>,
    /// Keep the `<column>_changed` and `row_changed` flags in the written delta.
    #[serde(default)]
    pub annotate: bool,
    /// Unmatched headers and skipped rows, one per line.
    #[serde(default)]
    pub diagnostics: Option<String>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub path: String,
    pub table: String,
    /// Defaults to the top-level `id_column`.
    #[serde(default)]
    pub id_column: Option<String>,
    #[serde(default = "default_numeric_markers")]
    pub numeric_markers: Vec<String>,
    /// Header row of the pipe-delimited export.
    #[serde(default = "default_store_header_row")]
    pub header_row: usize,
    #[serde(default = "default_store_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub discrepancies: Option<String>,
}

fn default_numeric_markers() -> Vec<String> {
    DEFAULT_NUMERIC_MARKERS.iter().map(|s| s.to_string()).collect()
}

fn default_store_header_row() -> usize {
    2
}

fn default_store_delimiter() -> char {
    '|'
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CrosswalkConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: CrosswalkConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.matcher.threshold > 100 {
            return Err(ReconError::ConfigValidation(format!(
                "matcher.threshold must be between 0 and 100, got {}",
                self.matcher.threshold
            )));
        }

        if self.id_column.trim().is_empty() {
            return Err(ReconError::ConfigValidation("id_column must not be empty".into()));
        }

        for (side, input) in [("source", &self.source), ("reference", &self.reference)] {
            if input.extensions.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{side}.extensions must list at least one extension"
                )));
            }
        }

        if let Some(mapping) = self.static_mapping()? {
            // Targets may be shared; the first external names the origin.
            let mut origin: HashMap<&str, &str> = HashMap::new();
            for entry in mapping.entries() {
                origin.entry(&entry.target).or_insert(&entry.external);
            }
            for extra in &self.extra_columns {
                if let Some(external) = origin.get(extra.as_str()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "extra column '{extra}' collides with the target of '{external}'"
                    )));
                }
            }
            let id_covered = origin.contains_key(self.id_column.as_str())
                || self.extra_columns.iter().any(|c| *c == self.id_column);
            if !id_covered {
                return Err(ReconError::ConfigValidation(format!(
                    "static mapping does not produce the id column '{}'",
                    self.id_column
                )));
            }
        }

        if let Some(store) = &self.store {
            if store.table.trim().is_empty() {
                return Err(ReconError::ConfigValidation("store.table must not be empty".into()));
            }
            if store.path.trim().is_empty() {
                return Err(ReconError::ConfigValidation("store.path must not be empty".into()));
            }
        }

        Ok(())
    }

    /// The `[[column]]` crosswalk, or `None` when the config carries none.
    pub fn static_mapping(&self) -> Result<Option<ColumnMapping>, ReconError> {
        if self.columns.is_empty() {
            return Ok(None);
        }
        ColumnMapping::from_entries(self.columns.clone()).map(Some)
    }

    /// Source columns kept under static substitution: mapping keys, then extras.
    pub fn source_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.columns.iter().map(|e| e.external.clone()).collect();
        for extra in &self.extra_columns {
            if !columns.contains(extra) {
                columns.push(extra.clone());
            }
        }
        columns
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions::new(self.id_column.clone())
    }

    pub fn store_id_column(&self) -> Option<&str> {
        self.store
            .as_ref()
            .map(|s| s.id_column.as_deref().unwrap_or(&self.id_column))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
name = "Supplier sync"
id_column = "Supplier ID"
extra_columns = ["Wave"]

[matcher]
threshold = 85

[source]
path = "data/source"
skip_rows = 1
header_row = 0
delimiter = "|"

[reference]
path = "data/reference.xlsx"

[output]
delta = "out/delta.xlsx"
annotate = true
diagnostics = "out/diagnostics.txt"

[[column]]
external = "Supplier Number"
target = "Supplier ID"

[[column]]
external = "Coupa Status"
target = "Status"

[store]
path = "suppliers.db"
table = "suppliers"
"#;

    #[test]
    fn parse_full() {
        let config = CrosswalkConfig::from_toml(FULL).unwrap();
        assert_eq!(config.name, "Supplier sync");
        assert_eq!(config.matcher.threshold, 85);
        assert_eq!(config.source.path.as_deref(), Some("data/source"));
        assert_eq!(config.source.skip_rows, 1);
        assert_eq!(config.source.delimiter, Some('|'));
        assert_eq!(config.reference.extensions, default_extensions());
        assert!(config.output.annotate);

        let mapping = config.static_mapping().unwrap().unwrap();
        assert_eq!(mapping.get("Coupa Status"), Some("Status"));
        assert_eq!(
            config.source_columns(),
            vec!["Supplier Number", "Coupa Status", "Wave"]
        );

        let store = config.store.as_ref().unwrap();
        assert_eq!(store.header_row, 2);
        assert_eq!(store.delimiter, '|');
        assert_eq!(store.numeric_markers, vec!["Amount", "Vchr"]);
        assert_eq!(config.store_id_column(), Some("Supplier ID"));
    }

    #[test]
    fn minimal_uses_defaults() {
        let config = CrosswalkConfig::from_toml("").unwrap();
        assert_eq!(config.id_column, "Supplier ID");
        assert_eq!(config.matcher.threshold, 80);
        assert!(config.static_mapping().unwrap().is_none());
        assert!(config.store.is_none());
        assert_eq!(config.merge_options().id_column, "Supplier ID");
    }

    #[test]
    fn rejects_threshold_over_100() {
        let err = CrosswalkConfig::from_toml("[matcher]\nthreshold = 101\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)));
    }

    #[test]
    fn accepts_shared_target() {
        let input = r#"
[[column]]
external = "Supplier ID"
target = "Supplier ID"

[[column]]
external = "Supplier Portal Status"
target = "RN Status"

[[column]]
external = "RiseNow Status"
target = "RN Status"
"#;
        let config = CrosswalkConfig::from_toml(input).unwrap();
        let mapping = config.static_mapping().unwrap().unwrap();
        assert_eq!(mapping.get("Supplier Portal Status"), Some("RN Status"));
        assert_eq!(mapping.get("RiseNow Status"), Some("RN Status"));
        assert_eq!(
            config.source_columns(),
            vec!["Supplier ID", "Supplier Portal Status", "RiseNow Status"]
        );
    }

    #[test]
    fn rejects_extra_colliding_with_target() {
        let input = r#"
extra_columns = ["Status"]

[[column]]
external = "Supplier ID"
target = "Supplier ID"

[[column]]
external = "Coupa Status"
target = "Status"
"#;
        assert!(CrosswalkConfig::from_toml(input).is_err());
    }

    #[test]
    fn rejects_mapping_without_id() {
        let input = r#"
[[column]]
external = "Coupa Status"
target = "Status"
"#;
        let err = CrosswalkConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("id column"));
    }

    #[test]
    fn rejects_bad_type() {
        let err = CrosswalkConfig::from_toml("[matcher]\nthreshold = \"high\"\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn store_id_column_override() {
        let input = r#"
[store]
path = "x.db"
table = "t"
id_column = "SupplierKey"
"#;
        let config = CrosswalkConfig::from_toml(input).unwrap();
        assert_eq!(config.store_id_column(), Some("SupplierKey"));
    }
}
