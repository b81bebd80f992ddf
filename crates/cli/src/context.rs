//! Config loading shared by the config-driven commands.

use std::path::{Path, PathBuf};

use crosswalk_io::{load_mapping, read_crosswalk};
use crosswalk_recon::{match_columns, ColumnMapping, CrosswalkConfig, MatchOutcome};
use log::info;

use crate::exit_codes::{EXIT_CONFIG_INVALID, EXIT_IO};
use crate::CliError;

/// A parsed config plus the directory its relative paths resolve against.
pub struct ConfigContext {
    pub config: CrosswalkConfig,
    pub base_dir: PathBuf,
}

impl ConfigContext {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::with_code(EXIT_IO, format!("cannot read config '{}': {e}", path.display()))
        })?;
        let config = CrosswalkConfig::from_toml(&text)
            .map_err(|e| CliError::with_code(EXIT_CONFIG_INVALID, e.to_string()))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self { config, base_dir })
    }

    /// Absolute paths pass through unchanged.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }

    /// The command-line override if given, else the config path resolved
    /// against the config directory.
    pub fn input_path(&self, cli: Option<PathBuf>, configured: Option<&str>, what: &str) -> Result<PathBuf, CliError> {
        match (cli, configured) {
            (Some(path), _) => Ok(path),
            (None, Some(path)) => Ok(self.resolve(path)),
            (None, None) => Err(CliError::args(format!("no {what} path given"))
                .with_hint(format!("set {what}.path in the config or pass --{what}"))),
        }
    }
}

/// Where the column mapping of a run comes from.
pub enum MappingSource {
    /// `[[column]]` entries in the config.
    Static(ColumnMapping),
    /// A mapping file written by `xwalk match`.
    Saved(ColumnMapping),
    /// Live matching of a crosswalk file.
    Live(MatchOutcome),
}

impl MappingSource {
    pub fn mapping(&self) -> &ColumnMapping {
        match self {
            MappingSource::Static(m) | MappingSource::Saved(m) => m,
            MappingSource::Live(outcome) => &outcome.mapping,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, MappingSource::Static(_))
    }
}

/// Pick the mapping: an explicit saved mapping, then a live crosswalk, then
/// the config's static entries.
pub fn resolve_mapping(
    ctx: &ConfigContext,
    mapping: Option<PathBuf>,
    crosswalk: Option<PathBuf>,
) -> Result<MappingSource, CliError> {
    if let Some(path) = mapping {
        info!("using saved mapping '{}'", path.display());
        return Ok(MappingSource::Saved(load_mapping(&path)?));
    }
    if let Some(path) = crosswalk {
        let pairs = read_crosswalk(&path)?;
        let outcome = match_columns(&pairs, &ctx.config.matcher);
        info!(
            "matched {} of {} header(s) from '{}'",
            outcome.mapping.len(),
            outcome.mapping.len() + outcome.unmatched_count(),
            path.display()
        );
        return Ok(MappingSource::Live(outcome));
    }
    match ctx.config.static_mapping()? {
        Some(mapping) => Ok(MappingSource::Static(mapping)),
        None => Err(CliError::args("no column mapping available")
            .with_hint("add [[column]] entries to the config, or pass --mapping or --crosswalk")),
    }
}
