//! Input discovery: a source is a file, or a directory searched for the first
//! file with an accepted extension.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{IoError, SourceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    File(PathBuf),
    Directory(PathBuf),
}

impl SourceSpec {
    /// Classify `path`. Anything that is neither a file nor a directory is rejected.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        if path.is_file() {
            Ok(SourceSpec::File(path.to_path_buf()))
        } else if path.is_dir() {
            Ok(SourceSpec::Directory(path.to_path_buf()))
        } else {
            Err(SourceError::InvalidSource(path.to_path_buf()))
        }
    }

    /// The file to load. A file source is returned as-is, whatever its extension.
    pub fn find_file(&self, extensions: &[String]) -> Result<PathBuf, IoError> {
        match self {
            SourceSpec::File(path) => Ok(path.clone()),
            SourceSpec::Directory(dir) => {
                debug!("searching '{}' for {:?}", dir.display(), extensions);
                match walk(dir, extensions)? {
                    Some(found) => {
                        info!("using '{}'", found.display());
                        Ok(found)
                    }
                    None => Err(SourceError::NotFound {
                        dir: dir.clone(),
                        extensions: extensions.to_vec(),
                    }
                    .into()),
                }
            }
        }
    }
}

/// Resolve and find in one step.
pub fn locate(path: impl AsRef<Path>, extensions: &[String]) -> Result<PathBuf, IoError> {
    SourceSpec::resolve(path)?.find_file(extensions)
}

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    extensions
        .iter()
        .any(|ext| name.ends_with(&ext.to_ascii_lowercase()))
}

/// Files of a directory before its subdirectories, both in name order.
fn walk(dir: &Path, extensions: &[String]) -> Result<Option<PathBuf>, IoError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| IoError::read(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    if let Some(file) = entries
        .iter()
        .find(|p| p.is_file() && has_extension(p, extensions))
    {
        return Ok(Some(file.clone()));
    }
    for sub in entries.iter().filter(|p| p.is_dir()) {
        if let Some(found) = walk(sub, extensions)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}
