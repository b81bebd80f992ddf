//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                  |
//! |---------|------------|----------------------------------------------|
//! | 0       | Universal  | Success                                      |
//! | 1       | Universal  | General error (unspecified)                  |
//! | 2       | Universal  | CLI usage error (bad args, missing option)   |
//! | 3-9     | io         | Reading and writing files                    |
//! | 10-19   | config     | Config and mapping files                      |
//! | 20-29   | match      | Column matching                              |
//! | 30-39   | merge      | Entity merge                                 |
//! | 40-49   | store      | Relational store import/update               |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use crosswalk_io::{IoError, SourceError, StoreError};
use crosswalk_recon::{MergeError, ReconError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// IO (3-9)
// =============================================================================

/// Input path does not exist, or a directory holds no accepted file.
pub const EXIT_IO_NOT_FOUND: u8 = 3;

/// A file could not be read or written.
pub const EXIT_IO: u8 = 4;

/// A file was read but its contents could not be parsed into a table.
pub const EXIT_IO_PARSE: u8 = 5;

// =============================================================================
// Config (10-19)
// =============================================================================

/// Config or mapping file failed to parse or validate.
pub const EXIT_CONFIG_INVALID: u8 = 10;

// =============================================================================
// Match (20-29)
// =============================================================================

/// Some external headers found no target (only with --strict).
pub const EXIT_MATCH_UNMATCHED: u8 = 20;

// =============================================================================
// Merge (30-39)
// =============================================================================

/// A table lacks the entity id column.
pub const EXIT_MERGE_MISSING_ID: u8 = 30;

/// Duplicate entity ids on one side.
pub const EXIT_MERGE_DUPLICATE_IDS: u8 = 31;

/// Renaming or annotating produced an invalid schema.
pub const EXIT_MERGE_SCHEMA: u8 = 32;

// =============================================================================
// Store (40-49)
// =============================================================================

/// Store table or id column missing, or a SQLite failure outside the batch.
pub const EXIT_STORE: u8 = 40;

/// Some entity updates failed (only with --strict).
pub const EXIT_STORE_DISCREPANCIES: u8 = 41;

// =============================================================================
// Error Mapping
// =============================================================================

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Source(SourceError::InvalidSource(_)) | IoError::Source(SourceError::NotFound { .. }) => {
            EXIT_IO_NOT_FOUND
        }
        IoError::Read { .. } | IoError::Write { .. } => EXIT_IO,
        IoError::Malformed { .. } | IoError::UnsupportedFormat(_) | IoError::MissingHeader { .. } => {
            EXIT_IO_PARSE
        }
        IoError::Schema(e) => recon_exit_code(e),
    }
}

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) | ReconError::Mapping(_) => {
            EXIT_CONFIG_INVALID
        }
        ReconError::DuplicateColumn(_) | ReconError::MissingColumn(_) | ReconError::RowWidth { .. } => {
            EXIT_MERGE_SCHEMA
        }
    }
}

pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::MissingIdColumn { .. } => EXIT_MERGE_MISSING_ID,
        MergeError::DuplicateEntities { .. } => EXIT_MERGE_DUPLICATE_IDS,
        MergeError::Schema(e) => recon_exit_code(e),
    }
}

pub fn store_exit_code(_err: &StoreError) -> u8 {
    EXIT_STORE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosswalk_recon::Side;
    use std::path::PathBuf;

    #[test]
    fn codes_are_unique_per_domain() {
        let codes = [
            EXIT_IO_NOT_FOUND,
            EXIT_IO,
            EXIT_IO_PARSE,
            EXIT_CONFIG_INVALID,
            EXIT_MATCH_UNMATCHED,
            EXIT_MERGE_MISSING_ID,
            EXIT_MERGE_DUPLICATE_IDS,
            EXIT_MERGE_SCHEMA,
            EXIT_STORE,
            EXIT_STORE_DISCREPANCIES,
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(*a > EXIT_USAGE);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn nested_schema_errors_map_through() {
        let err = IoError::Schema(ReconError::Mapping("x".into()));
        assert_eq!(io_exit_code(&err), EXIT_CONFIG_INVALID);

        let err = MergeError::Schema(ReconError::DuplicateColumn("Status".into()));
        assert_eq!(merge_exit_code(&err), EXIT_MERGE_SCHEMA);

        let err = MergeError::MissingIdColumn {
            side: Side::Reference,
            column: "Supplier ID".into(),
        };
        assert_eq!(merge_exit_code(&err), EXIT_MERGE_MISSING_ID);

        let err = IoError::Source(SourceError::InvalidSource(PathBuf::from("nope")));
        assert_eq!(io_exit_code(&err), EXIT_IO_NOT_FOUND);
    }
}
