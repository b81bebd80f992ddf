//! `crosswalk-recon`: schema crosswalk matching and change-tracking merge engine.
//!
//! Pure engine crate: receives pre-loaded tables and header lists, returns
//! mappings, merged tables and reports. No CLI or IO dependencies.

pub mod config;
pub mod entity;
pub mod error;
pub mod header;
pub mod mapping;
pub mod matcher;
pub mod merge;
pub mod similarity;
pub mod table;
pub mod update;

pub use config::CrosswalkConfig;
pub use entity::{EntityId, Side};
pub use error::{MergeError, ReconError};
pub use header::{normalize_header, HeaderString};
pub use mapping::{ColumnMapping, DroppedColumn, MappingEntry};
pub use matcher::{match_columns, pair_headers, HeaderPair, MatchOutcome, MatcherConfig};
pub use merge::{merge, MergeOptions, MergeReport, MergeResult, RowSkip, SkipReason};
pub use table::{ColumnId, Schema, Table, Value};
pub use update::{apply_updates, Discrepancy, StoreUpdate, UpdateReport, UpdateSink};
