//! `xwalk update` and `xwalk import`: the SQLite side.

use std::path::PathBuf;

use crosswalk_io::{import_table, load_table, write_lines, LoadOptions, SqliteStore};
use crosswalk_recon::update::{build_updates, plan_updates, UpdatePlan, UpdateReport, UpdateSink};
use rusqlite::Connection;
use serde::Serialize;

use crate::context::{resolve_mapping, ConfigContext};
use crate::exit_codes::{EXIT_STORE, EXIT_STORE_DISCREPANCIES};
use crate::CliError;

#[derive(Serialize)]
struct UpdateOutput<'a> {
    store: String,
    table: &'a str,
    plan: &'a UpdatePlan,
    skipped_rows: usize,
    report: &'a UpdateReport,
}

pub fn cmd_update(
    config_path: PathBuf,
    input: PathBuf,
    mapping: Option<PathBuf>,
    json: bool,
    strict: bool,
) -> Result<(), CliError> {
    let ctx = ConfigContext::load(&config_path)?;
    let config = &ctx.config;
    let Some(store_config) = config.store.as_ref() else {
        return Err(CliError::args("config has no [store] section"));
    };
    let store_id_column = config.store_id_column().unwrap_or(&config.id_column);

    let mapping = resolve_mapping(&ctx, mapping, None)?;

    let delimiter = u8::try_from(store_config.delimiter)
        .map_err(|_| CliError::args(format!("store.delimiter '{}' is not a single byte", store_config.delimiter)))?;
    let loaded = load_table(
        &input,
        &LoadOptions {
            header_row: store_config.header_row,
            delimiter: Some(delimiter),
            ..LoadOptions::default()
        },
    )?;

    // Shared targets reverse to the column a merge of this input would keep.
    let reverse = mapping.mapping().reverse(loaded.table.schema().names());

    let store_path = ctx.resolve(&store_config.path);
    let mut store = SqliteStore::open(&store_path, &store_config.table, store_id_column)?;
    let plan = plan_updates(
        &store.columns()?,
        store_id_column,
        &reverse,
        loaded.table.schema(),
        &store_config.numeric_markers,
    );
    if !loaded.table.schema().contains(&plan.input_id_column) {
        return Err(CliError::with_code(
            EXIT_STORE,
            format!("'{}' has no '{}' column", input.display(), plan.input_id_column),
        )
        .with_hint("the mapping must map an input column onto the store id column"));
    }

    let (updates, skipped) = build_updates(&loaded.table, &plan);
    let report = store.apply_batch(&updates)?;

    if let Some(ref path) = store_config.discrepancies {
        let path = ctx.resolve(path);
        write_lines(&path, &report.discrepancies)?;
        eprintln!("wrote {}", path.display());
    }

    eprintln!(
        "update '{}': {} column(s), {} attempted, {} applied, {} discrepancies, {} row(s) without id",
        store_config.table,
        plan.columns.len(),
        report.attempted,
        report.applied,
        report.discrepancies.len(),
        skipped.len(),
    );

    if json {
        let output = UpdateOutput {
            store: store_path.display().to_string(),
            table: &store_config.table,
            plan: &plan,
            skipped_rows: skipped.len(),
            report: &report,
        };
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    if strict && !report.discrepancies.is_empty() {
        return Err(CliError::with_code(
            EXIT_STORE_DISCREPANCIES,
            format!("{} entity update(s) failed", report.discrepancies.len()),
        ));
    }
    Ok(())
}

pub fn cmd_import(
    input: PathBuf,
    db: PathBuf,
    table: String,
    skip_rows: usize,
    header_row: usize,
    delimiter: Option<char>,
) -> Result<(), CliError> {
    let delimiter = delimiter
        .map(|c| u8::try_from(c).map_err(|_| CliError::args(format!("--delimiter '{c}' is not a single byte"))))
        .transpose()?;
    let loaded = load_table(
        &input,
        &LoadOptions {
            skip_rows,
            header_row,
            delimiter,
            ..LoadOptions::default()
        },
    )?;

    let conn = Connection::open(&db)
        .map_err(|e| CliError::with_code(EXIT_STORE, format!("cannot open '{}': {e}", db.display())))?;
    let rows = import_table(&conn, &table, &loaded.table)?;
    eprintln!("imported {} row(s) into '{}' in {}", rows, table, db.display());
    Ok(())
}
