use std::fs;

use crosswalk_io::{load_input, load_table, read_crosswalk, write_lines, write_table, LoadOptions, SqliteStore};
use crosswalk_recon::config::InputConfig;
use crosswalk_recon::update::{build_updates, plan_updates, UpdateSink};
use crosswalk_recon::{match_columns, merge, MatcherConfig, MergeOptions, Schema, Table, Value};
use rusqlite::Connection;
use tempfile::tempdir;

fn reference_table() -> Table {
    Table::from_rows(
        Schema::new(["Supplier ID", "Status", "Spend Amount"]).unwrap(),
        vec![
            vec![Value::Number(100.0), Value::text("Approved"), Value::Number(1200.0)],
            vec![Value::Number(200.0), Value::text("Active"), Value::Missing],
            vec![Value::text("n/a"), Value::text("Active"), Value::Missing],
        ],
    )
    .unwrap()
}

#[test]
fn directory_source_merged_against_workbook() {
    let dir = tempdir().unwrap();
    let source_dir = dir.path().join("source");
    fs::create_dir_all(source_dir.join("archive")).unwrap();
    fs::write(source_dir.join("notes.txt"), "ignored").unwrap();
    fs::write(
        source_dir.join("suppliers.csv"),
        "Coupa export\nSupplier Number|Coupa Status|Spend\n100|Pending|$1,000\n200.0|Active|\n",
    )
    .unwrap();
    fs::write(source_dir.join("archive").join("old.csv"), "x\n1\n").unwrap();

    let reference_path = dir.path().join("reference.xlsx");
    write_table(&reference_table(), &reference_path).unwrap();

    let crosswalk_path = dir.path().join("headers.txt");
    fs::write(
        &crosswalk_path,
        "Supplier Number|,[Supplier ID]\nCoupa Status|,[Status]\nSpend|,[Spend Amount]\n",
    )
    .unwrap();
    let pairs = read_crosswalk(&crosswalk_path).unwrap();
    let outcome = match_columns(&pairs, &MatcherConfig { threshold: 60 });
    assert_eq!(outcome.mapping.get("Supplier Number"), Some("Supplier ID"));
    assert_eq!(outcome.mapping.get("Spend"), Some("Spend Amount"));

    let source = load_input(
        &source_dir,
        &InputConfig {
            skip_rows: 1,
            ..InputConfig::default()
        },
    )
    .unwrap();
    assert_eq!(source.path, source_dir.join("suppliers.csv"));

    let reference = load_input(&reference_path, &InputConfig::default()).unwrap();
    assert_eq!(reference.table.len(), 3);

    let (aligned, dropped) = source.table.rename(&outcome.mapping);
    assert!(dropped.is_empty());
    let result = merge(aligned, &reference.table, &MergeOptions::default()).unwrap();
    assert_eq!(result.report().reference_rows_kept, 2);
    assert_eq!(result.changed_rows(), vec![0]);

    let delta_path = dir.path().join("delta.csv");
    write_table(&result.delta(), &delta_path).unwrap();
    assert_eq!(
        fs::read_to_string(&delta_path).unwrap(),
        "Supplier ID,Status,Spend Amount\n100,Approved,1200\n"
    );

    let diagnostics = dir.path().join("diagnostics.txt");
    let written = write_lines(&diagnostics, result.report().skipped.iter()).unwrap();
    assert_eq!(written, result.report().skipped.len());
}

#[test]
fn export_pushed_into_store() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("suppliers.db");
    {
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE suppliers (\"Supplier ID\" TEXT, \"Status\" TEXT, \"Spend Amount\" REAL);
             INSERT INTO suppliers VALUES ('100', 'Pending', NULL);",
        )
        .unwrap();
    }

    let export = dir.path().join("export.txt");
    fs::write(
        &export,
        "Report\nGenerated\nSupplier Number|Coupa Status|Spend\n100.0|Approved|$1,250.50\n404|Active|1\n|Orphan|2\n",
    )
    .unwrap();
    let loaded = load_table(
        &export,
        &LoadOptions {
            header_row: 2,
            delimiter: Some(b'|'),
            ..LoadOptions::default()
        },
    )
    .unwrap();

    let mut store = SqliteStore::open(&db, "suppliers", "Supplier ID").unwrap();
    let reverse = [
        ("Supplier ID", "Supplier Number"),
        ("Status", "Coupa Status"),
        ("Spend Amount", "Spend"),
    ]
    .iter()
    .map(|(t, e)| (t.to_string(), e.to_string()))
    .collect();
    let markers = vec!["Amount".to_string()];
    let plan = plan_updates(
        &store.columns().unwrap(),
        "Supplier ID",
        &reverse,
        loaded.table.schema(),
        &markers,
    );
    let (updates, skipped) = build_updates(&loaded.table, &plan);
    assert_eq!(updates.len(), 2);
    assert_eq!(skipped.len(), 1);

    let report = store.apply_batch(&updates).unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.discrepancies.len(), 1);
    assert_eq!(report.discrepancies[0].entity_id, "404");

    let (status, spend): (String, f64) = store
        .connection()
        .query_row(
            "SELECT \"Status\", \"Spend Amount\" FROM suppliers WHERE \"Supplier ID\" = '100'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(status, "Approved");
    assert_eq!(spend, 1250.5);
}
