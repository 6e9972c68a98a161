//! Config Command
//!
//! Inspect the effective configuration.
//!
//! Usage:
//!   factweave config show [-f toml|json|yaml]
//!   factweave config path

use std::path::Path;

use console::style;

use crate::cli::{Output, load_config};
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the configuration merged from defaults, files and environment
pub fn show(format: &str, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    println!("{}", ConfigLoader::render(&config, format)?);
    Ok(())
}

/// Show configuration file locations
pub fn path() -> Result<()> {
    let out = Output::new();
    out.section("Configuration files");
    for (label, path, exists) in ConfigLoader::describe_paths() {
        let shown = match path {
            Some(path) => path.display().to_string(),
            None => "(unavailable on this platform)".to_string(),
        };
        let marker = if exists {
            style("found").green()
        } else {
            style("missing").dim()
        };
        println!("  {:<8} {} [{}]", label, shown, marker);
    }
    out.info("Environment overrides use the FACTWEAVE_ prefix, e.g. FACTWEAVE_PIPELINE__MAX_ATTEMPTS=5");
    Ok(())
}
