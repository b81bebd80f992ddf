// crosswalk CLI - header matching, supplier merge and store updates

mod context;
mod exit_codes;
mod merge;
mod store;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use crosswalk_io::{read_crosswalk, save_mapping, write_lines, IoError, StoreError};
use crosswalk_recon::{match_columns, MatcherConfig, MergeError, ReconError};
use env_logger::Env;

use exit_codes::{
    io_exit_code, merge_exit_code, recon_exit_code, store_exit_code, EXIT_ERROR, EXIT_MATCH_UNMATCHED,
    EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "xwalk")]
#[command(about = "Reconcile supplier exports against a canonical schema")]
#[command(version)]
struct Cli {
    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match external headers to target headers from a pipe-delimited crosswalk file
    #[command(after_help = "\
Examples:
  xwalk match headers.txt
  xwalk match headers.txt --threshold 85 --out mapping.toml
  xwalk match headers.txt --json --strict")]
    Match {
        /// Crosswalk file: one `external|target` pair per line
        crosswalk: PathBuf,

        /// Minimum fuzzy score (0-100) for a match
        #[arg(long, default_value_t = crosswalk_recon::matcher::DEFAULT_THRESHOLD)]
        threshold: u8,

        /// Write the resulting mapping as TOML
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Write one line per unmatched header
        #[arg(long)]
        diagnostics: Option<PathBuf>,

        /// Print the full outcome as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Exit non-zero when any header is unmatched
        #[arg(long)]
        strict: bool,
    },

    /// Merge reference values into the source table and write the changed rows
    #[command(after_help = "\
Examples:
  xwalk merge crosswalk.toml
  xwalk merge crosswalk.toml --mapping mapping.toml
  xwalk merge crosswalk.toml --crosswalk headers.txt --out delta.xlsx --json")]
    Merge {
        /// Path to the crosswalk config file
        config: PathBuf,

        /// Use a saved mapping instead of the config's [[column]] entries
        #[arg(long, conflicts_with = "crosswalk")]
        mapping: Option<PathBuf>,

        /// Match headers live from a crosswalk file
        #[arg(long)]
        crosswalk: Option<PathBuf>,

        /// Override the config's source path
        #[arg(long)]
        source: Option<PathBuf>,

        /// Override the config's reference path
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Override the config's delta output path
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Print the merge report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Push an exported table into the configured SQLite store, one UPDATE per entity
    #[command(after_help = "\
Examples:
  xwalk update crosswalk.toml export.txt
  xwalk update crosswalk.toml export.txt --mapping mapping.toml --strict")]
    Update {
        /// Path to the crosswalk config file (must have a [store] section)
        config: PathBuf,

        /// Exported table keyed by the external id column
        input: PathBuf,

        /// Use a saved mapping instead of the config's [[column]] entries
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Print the update report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Exit non-zero when any entity update failed
        #[arg(long)]
        strict: bool,
    },

    /// Load a file into a new SQLite table of text columns
    #[command(after_help = "\
Examples:
  xwalk import dump.csv --db suppliers.db --table data_dump_raw
  xwalk import dump.xlsx --db suppliers.db --table data_dump_raw --skip-rows 2")]
    Import {
        /// File to load
        input: PathBuf,

        /// SQLite database file
        #[arg(long)]
        db: PathBuf,

        /// Table to create
        #[arg(long)]
        table: String,

        /// Physical rows dropped before the header
        #[arg(long, default_value_t = 0)]
        skip_rows: usize,

        /// Header row, counted after skipped rows
        #[arg(long, default_value_t = 0)]
        header_row: usize,

        /// Text delimiter (sniffed when omitted)
        #[arg(long)]
        delimiter: Option<char>,
    },

    /// Validate a crosswalk config without running
    #[command(after_help = "\
Examples:
  xwalk validate crosswalk.toml")]
    Validate {
        /// Path to the crosswalk config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Match {
            crosswalk,
            threshold,
            out,
            diagnostics,
            json,
            strict,
        } => cmd_match(crosswalk, threshold, out, diagnostics, json, strict),
        Commands::Merge {
            config,
            mapping,
            crosswalk,
            source,
            reference,
            out,
            json,
        } => merge::cmd_merge(merge::MergeArgs {
            config,
            mapping,
            crosswalk,
            source,
            reference,
            out,
            json,
        }),
        Commands::Update {
            config,
            input,
            mapping,
            json,
            strict,
        } => store::cmd_update(config, input, mapping, json, strict),
        Commands::Import {
            input,
            db,
            table,
            skip_rows,
            header_row,
            delimiter,
        } => store::cmd_import(input, db, table, skip_rows, header_row, delimiter),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_code(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let code = io_exit_code(&err);
        let hint = match &err {
            IoError::MissingHeader { .. } => Some("check skip_rows and header_row".to_string()),
            IoError::Source(_) => Some("paths in a config resolve against the config file's directory".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        Self { code: recon_exit_code(&err), message: err.to_string(), hint: None }
    }
}

impl From<MergeError> for CliError {
    fn from(err: MergeError) -> Self {
        let code = merge_exit_code(&err);
        let hint = match &err {
            MergeError::MissingIdColumn { .. } => {
                Some("does the mapping produce the id column? see `id_column` in the config".to_string())
            }
            MergeError::DuplicateEntities { .. } => Some("each entity id may appear once per table".to_string()),
            MergeError::Schema(_) => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self { code: store_exit_code(&err), message: err.to_string(), hint: None }
    }
}

fn cmd_match(
    crosswalk: PathBuf,
    threshold: u8,
    out: Option<PathBuf>,
    diagnostics: Option<PathBuf>,
    json: bool,
    strict: bool,
) -> Result<(), CliError> {
    if threshold > 100 {
        return Err(CliError::args(format!("--threshold must be between 0 and 100, got {threshold}")));
    }

    let pairs = read_crosswalk(&crosswalk)?;
    let outcome = match_columns(&pairs, &MatcherConfig { threshold });

    if let Some(ref path) = out {
        save_mapping(&outcome.mapping, path)?;
        eprintln!("wrote {}", path.display());
    }
    if let Some(ref path) = diagnostics {
        write_lines(path, &outcome.unmatched)?;
    }

    if json {
        let json_str = serde_json::to_string_pretty(&outcome)
            .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    eprintln!(
        "{} header(s): {} matched, {} unmatched, {} duplicate(s), {} target(s) unclaimed",
        pairs.iter().filter(|p| p.external.is_some()).count(),
        outcome.mapping.len(),
        outcome.unmatched_count(),
        outcome.duplicates.len(),
        outcome.unclaimed_targets.len(),
    );
    for unmatched in &outcome.unmatched {
        eprintln!("  {unmatched}");
    }

    if strict && outcome.unmatched_count() > 0 {
        return Err(CliError::with_code(
            EXIT_MATCH_UNMATCHED,
            format!("{} header(s) unmatched", outcome.unmatched_count()),
        ));
    }
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let loaded = context::ConfigContext::load(&config_path)?;
    let config = &loaded.config;
    let mapping = match config.static_mapping()? {
        Some(m) => format!("{} static column(s)", m.len()),
        None => "live matching".to_string(),
    };
    eprintln!(
        "valid: crosswalk '{}' keyed on '{}', {}, threshold {}{}",
        config.name,
        config.id_column,
        mapping,
        config.matcher.threshold,
        if config.store.is_some() { ", with store" } else { "" },
    );
    Ok(())
}
