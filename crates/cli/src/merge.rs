//! `xwalk merge`: load, align, merge, write the delta.

use std::path::{Path, PathBuf};

use crosswalk_io::{load_table, locate, log_merge_summary, write_lines, write_table, LoadOptions, Loaded};
use crosswalk_recon::config::InputConfig;
use crosswalk_recon::{merge, MergeReport};
use log::warn;
use serde::Serialize;

use crate::context::{resolve_mapping, ConfigContext, MappingSource};
use crate::CliError;

pub struct MergeArgs {
    pub config: PathBuf,
    pub mapping: Option<PathBuf>,
    pub crosswalk: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub json: bool,
}

#[derive(Serialize)]
struct MergeOutput<'a> {
    name: &'a str,
    source: String,
    reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    delta: Option<String>,
    unmatched_headers: Vec<String>,
    dropped_columns: Vec<String>,
    report: &'a MergeReport,
}

pub fn cmd_merge(args: MergeArgs) -> Result<(), CliError> {
    let ctx = ConfigContext::load(&args.config)?;
    let config = &ctx.config;
    let mapping = resolve_mapping(&ctx, args.mapping, args.crosswalk)?;

    // Source: under a static mapping only the mapped columns and extras survive.
    let source_path = ctx.input_path(args.source, config.source.path.as_deref(), "source")?;
    let mut source_options = LoadOptions::from(&config.source);
    if mapping.is_static() && source_options.keep_columns.is_empty() {
        source_options.keep_columns = config.source_columns();
    }
    let source = load(&source_path, &config.source, &source_options)?;

    let reference_path = ctx.input_path(args.reference, config.reference.path.as_deref(), "reference")?;
    let reference = load(&reference_path, &config.reference, &LoadOptions::from(&config.reference))?;

    // A shared target goes to the first claiming column in load order.
    let (aligned, dropped) = source.table.rename(mapping.mapping());
    let dropped_columns: Vec<String> = dropped.iter().map(|d| d.to_string()).collect();
    for line in &dropped_columns {
        warn!("{line}");
    }
    let result = merge(aligned, &reference.table, &config.merge_options())?;
    let report = result.report();

    let delta_path = args
        .out
        .or_else(|| config.output.delta.as_deref().map(|p| ctx.resolve(p)));
    if let Some(ref path) = delta_path {
        let delta = if config.output.annotate {
            result.annotated_delta()?
        } else {
            result.delta()
        };
        write_table(&delta, path)?;
        eprintln!("wrote {}", path.display());
    }

    let unmatched_headers: Vec<String> = match &mapping {
        MappingSource::Live(outcome) => outcome.unmatched.iter().map(|u| u.to_string()).collect(),
        _ => Vec::new(),
    };
    for line in &unmatched_headers {
        warn!("{line}");
    }

    if let Some(ref diagnostics) = config.output.diagnostics {
        let path = ctx.resolve(diagnostics);
        let lines = unmatched_headers
            .iter()
            .cloned()
            .chain(dropped_columns.iter().map(|d| format!("source {d}")))
            .chain(source.skipped.iter().map(|s| format!("source {s}")))
            .chain(reference.skipped.iter().map(|s| format!("reference {s}")))
            .chain(report.skipped.iter().map(|s| format!("merge {s}")));
        let written = write_lines(&path, lines)?;
        eprintln!("wrote {} diagnostic line(s) to {}", written, path.display());
    }

    log_merge_summary(report);
    eprintln!(
        "merge: {} source rows, {} reference rows ({} kept), {} applied, {} changed",
        report.source_rows,
        report.reference_rows,
        report.reference_rows_kept,
        report.applied_rows,
        report.changed_rows,
    );

    if args.json {
        let output = MergeOutput {
            name: &config.name,
            source: source.path.display().to_string(),
            reference: reference.path.display().to_string(),
            delta: delta_path.as_ref().map(|p| p.display().to_string()),
            unmatched_headers,
            dropped_columns,
            report,
        };
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    Ok(())
}

fn load(path: &Path, input: &InputConfig, options: &LoadOptions) -> Result<Loaded, CliError> {
    let file = locate(path, &input.extensions)?;
    Ok(load_table(&file, options)?)
}
