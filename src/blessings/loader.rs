//! Load blessing definitions from TOML files
//!
//! Each file holds a `[[blessing]]` array. A directory is walked recursively
//! and every `.toml` file in it contributes definitions. Validation of the
//! combined set happens in `BlessingCatalog::new`.

use std::path::Path;

use serde::Deserialize;

use super::catalog::BlessingCatalog;
use super::definition::BlessingDefinition;
use crate::core::error::{LoadError, ProgressionError};

#[derive(Deserialize)]
struct BlessingFile {
    #[serde(default)]
    blessing: Vec<BlessingDefinition>,
}

/// Parse definitions from a TOML string
pub fn parse_blessings(content: &str, origin: &str) -> Result<Vec<BlessingDefinition>, LoadError> {
    let file: BlessingFile = toml::from_str(content).map_err(|source| LoadError::Toml {
        path: origin.to_string(),
        source,
    })?;
    Ok(file.blessing)
}

/// Load definitions from a single TOML file
pub fn load_file(path: &Path) -> Result<Vec<BlessingDefinition>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_blessings(&content, &path.display().to_string())
}

/// Load definitions from a file, or every .toml file under a directory
pub fn load_definitions(path: &Path) -> Result<Vec<BlessingDefinition>, LoadError> {
    if path.is_dir() {
        let mut definitions = Vec::new();
        load_directory_recursive(path, &mut definitions)?;
        Ok(definitions)
    } else {
        load_file(path)
    }
}

fn load_directory_recursive(
    path: &Path,
    definitions: &mut Vec<BlessingDefinition>,
) -> Result<(), LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.display().to_string(),
        source,
    };

    // Sorted so definition order (and list_by_scope order) is stable across platforms
    let mut entries = std::fs::read_dir(path)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort();

    for entry_path in entries {
        if entry_path.is_dir() {
            load_directory_recursive(&entry_path, definitions)?;
        } else if entry_path.extension().map_or(false, |ext| ext == "toml") {
            definitions.extend(load_file(&entry_path)?);
        }
    }
    Ok(())
}

/// Load and validate a catalog in one step
pub fn load_catalog(path: &Path) -> Result<BlessingCatalog, ProgressionError> {
    let definitions = load_definitions(path)?;
    let count = definitions.len();
    let catalog = BlessingCatalog::new(definitions)?;
    tracing::info!(count, path = %path.display(), "Blessing catalog loaded");
    Ok(catalog)
}
