//! Crosswalk table: one `external|target` header pair per line, no header row.

use std::path::Path;

use crosswalk_recon::HeaderPair;

use crate::csv::{parse_records, read_file_as_utf8};
use crate::error::IoError;

pub const CROSSWALK_DELIMITER: u8 = b'|';

/// Parse crosswalk text. Blank fields become missing headers; fields past
/// the second are ignored.
pub fn parse_crosswalk(content: &str, delimiter: u8) -> Result<Vec<HeaderPair>, ::csv::Error> {
    let records = parse_records(content, delimiter)?;
    Ok(records
        .iter()
        .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
        .map(|r| HeaderPair::new(field(r, 0), field(r, 1)))
        .collect())
}

fn field(record: &[String], index: usize) -> Option<&str> {
    record
        .get(index)
        .map(String::as_str)
        .filter(|f| !f.trim().is_empty())
}

pub fn read_crosswalk(path: &Path) -> Result<Vec<HeaderPair>, IoError> {
    let content = read_file_as_utf8(path)?;
    parse_crosswalk(&content, CROSSWALK_DELIMITER).map_err(|e| IoError::malformed(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_with_gaps() {
        let content = "Supplier ID|,[Supplier ID]\nSupplierNm|\n|,[Contact Phone]\n\nOn CSP|,[On CSP]|ignored\n";
        let pairs = parse_crosswalk(content, CROSSWALK_DELIMITER).unwrap();
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], HeaderPair::new(Some("Supplier ID"), Some(",[Supplier ID]")));
        assert_eq!(pairs[1], HeaderPair::new(Some("SupplierNm"), None));
        assert_eq!(pairs[2], HeaderPair::new(None, Some(",[Contact Phone]")));
        assert_eq!(pairs[3].target.as_deref(), Some(",[On CSP]"));
    }

    #[test]
    fn single_column_line() {
        let pairs = parse_crosswalk("Only External\n", CROSSWALK_DELIMITER).unwrap();
        assert_eq!(pairs, vec![HeaderPair::new(Some("Only External"), None)]);
    }
}
