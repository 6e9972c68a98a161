//! CLI Common Utilities
//!
//! Config resolution and file helpers shared by the command handlers.

use std::path::Path;

use crate::config::{Config, ConfigLoader};
use crate::types::{FactweaveError, Facts, Result};

/// Load the effective configuration.
///
/// An explicit `--config` file replaces the global and project layers;
/// environment overrides still apply.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Read a facts document written by `factweave analyze` (JSON or YAML)
pub fn read_facts(path: &Path) -> Result<Facts> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FactweaveError::NotFound(format!("facts file {}: {}", path.display(), e))
    })?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if is_yaml {
        Ok(serde_yaml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

/// Write `content` to `path`, creating parent directories
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
