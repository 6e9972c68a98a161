//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global and project (.factweave/) level configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{context as ctx, pipeline as pipe, practice, quality, scan};
use crate::context::{Budget, OutlineExcerpt};
use crate::types::{FactweaveError, Result};
use crate::validation::EnforcementLevel;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Source tree scanning
    pub analysis: AnalysisConfig,

    /// Context pack budgeting
    pub context: ContextConfig,

    /// Orchestrator retry and time boxing
    pub pipeline: PipelineConfig,

    /// Grounded editor settings
    pub editor: EditorConfig,

    /// Practice section validation
    pub practice: PracticeConfig,

    /// Document quality report
    pub quality: QualityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            analysis: AnalysisConfig::default(),
            context: ContextConfig::default(),
            pipeline: PipelineConfig::default(),
            editor: EditorConfig::default(),
            practice: PracticeConfig::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `FactweaveError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_attempts == 0 {
            return Err(FactweaveError::Config(
                "pipeline.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.pipeline.timeout_secs == 0 {
            return Err(FactweaveError::Config(
                "pipeline.timeout_secs must be greater than 0".to_string(),
            ));
        }

        let factor = self.pipeline.backoff_factor;
        if !factor.is_finite() || factor < 1.0 {
            return Err(FactweaveError::Config(format!(
                "pipeline.backoff_factor must be a finite number >= 1.0, got {}",
                factor
            )));
        }

        if self.quality.min_words > self.quality.max_words {
            return Err(FactweaveError::Config(format!(
                "quality.min_words ({}) exceeds quality.max_words ({})",
                self.quality.min_words, self.quality.max_words
            )));
        }

        if !(0.0..=1.0).contains(&self.quality.repetition_threshold) {
            return Err(FactweaveError::Config(format!(
                "quality.repetition_threshold must be between 0.0 and 1.0, got {}",
                self.quality.repetition_threshold
            )));
        }

        if self.quality.ngram_size == 0 {
            return Err(FactweaveError::Config(
                "quality.ngram_size must be greater than 0".to_string(),
            ));
        }

        if let Some(group) = self.quality.synonym_groups.iter().find(|g| g.len() < 2) {
            return Err(FactweaveError::Config(format!(
                "quality.synonym_groups entries need at least two terms, got {:?}",
                group
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Glob patterns to exclude (matched against repository-relative paths)
    pub exclude: Vec<String>,

    /// Maximum file size in bytes
    pub max_file_size: u64,

    /// Honour .gitignore files
    pub respect_gitignore: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            exclude: scan::SKIP_DIRS
                .iter()
                .map(|d| format!("{}/**", d))
                .collect(),
            max_file_size: scan::MAX_FILE_SIZE,
            respect_gitignore: true,
        }
    }
}

// =============================================================================
// Context Profiles
// =============================================================================

/// Context size profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContextProfile {
    /// Small prompts for quick drafts
    Fast,
    #[default]
    Default,
    /// Large prompts for thorough sections
    Heavy,
}

impl ContextProfile {
    /// Budget parameters for this profile
    pub fn budget(&self) -> Budget {
        match self {
            ContextProfile::Fast => Budget::new(2000, 1000, 15),
            ContextProfile::Default => Budget::new(4000, 2000, 30),
            ContextProfile::Heavy => Budget::new(6000, 3000, 50),
        }
    }
}

impl std::fmt::Display for ContextProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextProfile::Fast => write!(f, "fast"),
            ContextProfile::Default => write!(f, "default"),
            ContextProfile::Heavy => write!(f, "heavy"),
        }
    }
}

impl std::str::FromStr for ContextProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(ContextProfile::Fast),
            "default" => Ok(ContextProfile::Default),
            "heavy" => Ok(ContextProfile::Heavy),
            _ => Err(format!(
                "Unknown context profile: {}. Valid values: fast, default, heavy",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub profile: ContextProfile,

    /// Overrides for the profile budget
    pub max_input_tokens: Option<usize>,
    pub max_output_tokens: Option<usize>,
    pub max_facts: Option<usize>,

    /// Maximum characters of one dependency synopsis
    pub synopsis_max_chars: usize,

    /// What later sections see of the outline
    pub outline_excerpt: OutlineExcerpt,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            profile: ContextProfile::Default,
            max_input_tokens: None,
            max_output_tokens: None,
            max_facts: None,
            synopsis_max_chars: ctx::SYNOPSIS_MAX_CHARS,
            outline_excerpt: OutlineExcerpt::Full,
        }
    }
}

impl ContextConfig {
    /// Effective budget: profile defaults with overrides applied
    pub fn budget(&self) -> Budget {
        let base = self.profile.budget();
        Budget::new(
            self.max_input_tokens.unwrap_or(base.max_input_tokens),
            self.max_output_tokens.unwrap_or(base.max_output_tokens),
            self.max_facts.unwrap_or(base.max_facts),
        )
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Attempts per section (first call included)
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay between retries in seconds
    pub max_delay_secs: u64,

    pub backoff_factor: f32,

    /// Time box for one generation call in seconds
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: pipe::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: pipe::BASE_DELAY_MS,
            max_delay_secs: pipe::MAX_DELAY_SECS,
            backoff_factor: pipe::BACKOFF_FACTOR,
            timeout_secs: pipe::DEFAULT_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Editor Configuration
// =============================================================================

/// One glossary entry: canonical term plus variants to normalize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub canonical: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub level: EnforcementLevel,
    pub glossary: Vec<GlossaryTerm>,
}

// =============================================================================
// Practice Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    pub min_entities: usize,
    pub require_entities: bool,
    pub require_algorithm: bool,
    pub require_table: bool,

    /// Domain terms counted as entities next to CamelCase identifiers
    pub domain_terms: Vec<String>,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            min_entities: practice::MIN_ENTITIES,
            require_entities: true,
            require_algorithm: true,
            require_table: true,
            domain_terms: to_strings(practice::DOMAIN_TERMS),
        }
    }
}

// =============================================================================
// Quality Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_words: usize,
    pub max_words: usize,
    pub ngram_size: usize,
    pub repetition_threshold: f64,

    /// Terms that name the same concept; a document should use only one per group
    pub synonym_groups: Vec<Vec<String>>,

    /// Regexes marking unfinished text
    pub placeholder_markers: Vec<String>,
    /// Generic openings; a section that is little more than one is filler
    pub filler_patterns: Vec<String>,
    /// Phrases stating that information is missing
    pub missing_info_markers: Vec<String>,
    /// Non-empty sections with fewer characters are placeholders (0 disables)
    pub min_content_chars: usize,
    /// Sections of one or two sentences with fewer characters are placeholders (0 disables)
    pub min_section_chars: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_words: quality::MIN_SECTION_WORDS,
            max_words: quality::MAX_SECTION_WORDS,
            ngram_size: quality::NGRAM_SIZE,
            repetition_threshold: quality::REPETITION_THRESHOLD,
            synonym_groups: Vec::new(),
            placeholder_markers: to_strings(quality::PLACEHOLDER_MARKERS),
            filler_patterns: to_strings(quality::FILLER_PATTERNS),
            missing_info_markers: to_strings(quality::MISSING_INFO_MARKERS),
            min_content_chars: quality::MIN_CONTENT_CHARS,
            min_section_chars: quality::MIN_SECTION_CHARS,
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_context_profile() {
        assert_eq!(ContextProfile::Fast.to_string(), "fast");
        assert_eq!(
            "HEAVY".parse::<ContextProfile>().unwrap(),
            ContextProfile::Heavy
        );
        assert!("huge".parse::<ContextProfile>().is_err());

        assert_eq!(ContextProfile::Fast.budget().max_facts, 15);
        assert_eq!(ContextProfile::Default.budget().max_input_tokens, 4000);
        assert_eq!(ContextProfile::Heavy.budget().max_output_tokens, 3000);
    }

    #[test]
    fn test_context_overrides() {
        let config = ContextConfig {
            max_input_tokens: Some(500),
            ..Default::default()
        };
        let budget = config.budget();
        assert_eq!(budget.max_input_tokens, 500);
        assert_eq!(budget.max_facts, 30);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.pipeline.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.quality.min_words = 5000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.quality.synonym_groups = vec![vec!["lonely".to_string()]];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_backoff() {
        for factor in [f32::NAN, f32::INFINITY, 0.5] {
            let mut config = Config::default();
            config.pipeline.backoff_factor = factor;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("backoff_factor"));
        }

        let mut config = Config::default();
        config.pipeline.backoff_factor = 1.0;
        assert!(config.validate().is_ok());
    }
}
