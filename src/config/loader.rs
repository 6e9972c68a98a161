//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (platform config dir, e.g. ~/.config/factweave/config.toml)
//! 3. Project config (.factweave/config.toml)
//! 4. Environment variables (FACTWEAVE_* prefix, `__` separates sections)

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::Config;
use crate::types::{FactweaveError, Result};

const ENV_PREFIX: &str = "FACTWEAVE_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_layers(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Load configuration from a specific file only (plus env overrides)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(FactweaveError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Self::load_layers(None, path)
    }

    fn load_layers(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // e.g. FACTWEAVE_PIPELINE__MAX_ATTEMPTS -> pipeline.max_attempts
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| FactweaveError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "factweave").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".factweave/config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Describe config file locations and whether they exist
    pub fn describe_paths() -> Vec<(String, Option<PathBuf>, bool)> {
        let global = Self::global_config_path();
        let global_exists = global.as_ref().is_some_and(|p| p.exists());
        let project = Self::project_config_path();
        let project_exists = project.exists();
        vec![
            ("Global".to_string(), global, global_exists),
            ("Project".to_string(), Some(project), project_exists),
        ]
    }

    /// Render the effective configuration in the given format (toml, json, yaml)
    pub fn render(config: &Config, format: &str) -> Result<String> {
        match format {
            "json" => Ok(serde_json::to_string_pretty(config)?),
            "yaml" => Ok(serde_yaml::to_string(config)?),
            "toml" | "text" => toml::to_string_pretty(config)
                .map_err(|e| FactweaveError::Config(e.to_string())),
            other => Err(FactweaveError::Config(format!(
                "Unknown format '{}'. Valid values: toml, json, yaml",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextProfile;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[context]
profile = "heavy"

[pipeline]
max_attempts = 5

[quality]
synonym_groups = [["database", "datastore", "DB"]]
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.context.profile, ContextProfile::Heavy);
        assert_eq!(config.pipeline.max_attempts, 5);
        assert_eq!(config.quality.synonym_groups[0].len(), 3);
        // Untouched sections keep defaults
        assert_eq!(config.quality.ngram_size, 3);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pipeline]\nmax_attempts = 0\n").unwrap();

        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, FactweaveError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(err.is_err());
    }

    #[test]
    fn test_env_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "version = \"1.0\"\n").unwrap();

        // SAFETY: no other test reads this variable
        unsafe {
            std::env::set_var("FACTWEAVE_PRACTICE__MIN_ENTITIES", "7");
        }
        let config = ConfigLoader::load_from_file(&path).unwrap();
        unsafe {
            std::env::remove_var("FACTWEAVE_PRACTICE__MIN_ENTITIES");
        }
        assert_eq!(config.practice.min_entities, 7);
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();
        assert!(
            ConfigLoader::render(&config, "toml")
                .unwrap()
                .contains("[pipeline]")
        );
        assert!(
            ConfigLoader::render(&config, "json")
                .unwrap()
                .contains("\"pipeline\"")
        );
        assert!(
            ConfigLoader::render(&config, "yaml")
                .unwrap()
                .contains("pipeline:")
        );
        assert!(ConfigLoader::render(&config, "xml").is_err());
    }
}
