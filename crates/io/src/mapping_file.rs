//! Persisted column mappings (`[[column]]` TOML).

use std::fs;
use std::path::Path;

use crosswalk_recon::ColumnMapping;
use log::info;

use crate::error::IoError;

pub fn save_mapping(mapping: &ColumnMapping, path: &Path) -> Result<(), IoError> {
    let text = mapping.to_toml()?;
    fs::write(path, text).map_err(|e| IoError::write(path, e))?;
    info!("wrote {} mapping entries to '{}'", mapping.len(), path.display());
    Ok(())
}

pub fn load_mapping(path: &Path) -> Result<ColumnMapping, IoError> {
    let text = fs::read_to_string(path).map_err(|e| IoError::read(path, e))?;
    Ok(ColumnMapping::from_toml(&text)?)
}
