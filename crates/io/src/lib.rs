// File discovery, tabular import/export and the SQLite store

pub mod crosswalk;
pub mod csv;
pub mod error;
pub mod load;
pub mod mapping_file;
pub mod report;
pub mod source;
pub mod sqlite;
pub mod xlsx;

pub use crosswalk::read_crosswalk;
pub use error::{IoError, SourceError, StoreError};
pub use load::{load_input, load_table, LoadOptions, Loaded};
pub use mapping_file::{load_mapping, save_mapping};
pub use report::{log_merge_summary, write_lines, write_table};
pub use source::{locate, SourceSpec};
pub use sqlite::{import_table, SqliteStore};
