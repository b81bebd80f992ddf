// Delimited text import/export

use std::io::Read;
use std::path::Path;

use crosswalk_recon::{Table, Value};

use crate::error::IoError;

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Most common field count across the sample; title rows above the
        // header often have a single field.
        let target = mode(&counts);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

fn mode(counts: &[usize]) -> usize {
    let mut best = (0usize, 0usize);
    for &c in counts {
        let n = counts.iter().filter(|&&x| x == c).count();
        if n > best.1 || (n == best.1 && c > best.0) {
            best = (c, n);
        }
    }
    best.0
}

/// Read file and convert to UTF-8 if needed (Windows-1252 fallback for Excel exports).
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::read(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::read(path, e))?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Parse every record as raw text fields. Records may differ in width.
pub fn parse_records(content: &str, delimiter: u8) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

/// Read a delimited file into a grid of text cells. Empty fields become missing.
pub fn read_grid(path: &Path, delimiter: Option<u8>) -> Result<Vec<Vec<Value>>, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    let records = parse_records(&content, delimiter).map_err(|e| IoError::malformed(path, e))?;
    Ok(records
        .into_iter()
        .map(|r| r.into_iter().map(Value::text).collect())
        .collect())
}

/// Write a table with a header row. Missing values become empty fields.
pub fn write_table(table: &Table, path: &Path, delimiter: u8) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| IoError::write(path, e))?;

    writer
        .write_record(table.schema().names())
        .map_err(|e| IoError::write(path, e))?;
    for row in table.rows() {
        let record: Vec<String> = row.iter().map(Value::render).collect();
        writer.write_record(&record).map_err(|e| IoError::write(path, e))?;
    }

    writer.flush().map_err(|e| IoError::write(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_pipe_delimiter() {
        let content = "Supplier ID|Status|Wave\n100|Pending|1\n200|Active|2\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_sniff_pipe_below_title_rows() {
        let content = "Supplier export\nGenerated 2024-01-01\nSupplier ID|Status|Wave\n100|Pending|1\n200|Active|2\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Café" with é as 0xE9
        fs::write(&path, b"Name\nCaf\xe9\n").unwrap();
        let text = read_file_as_utf8(&path).unwrap();
        assert_eq!(text, "Name\nCafé\n");
    }

    #[test]
    fn test_bom_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Supplier ID,Status\n1,a\n").unwrap();
        let grid = read_grid(&path, None).unwrap();
        assert_eq!(grid[0][0], Value::text("Supplier ID"));
    }

    #[test]
    fn test_grid_keeps_ragged_rows() {
        let records = parse_records("a|b|c\n1|2\n1|2|3|4\n", b'|').unwrap();
        assert_eq!(records[1].len(), 2);
        assert_eq!(records[2].len(), 4);
    }

    #[test]
    fn test_write_table_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = Table::from_rows(
            crosswalk_recon::Schema::new(["Supplier ID", "Note", "Amount"]).unwrap(),
            vec![vec![Value::text("100"), Value::text("a, b"), Value::Number(12.5)]],
        )
        .unwrap();
        write_table(&table, &path, b',').unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Supplier ID,Note,Amount\n100,\"a, b\",12.5\n");
    }
}
