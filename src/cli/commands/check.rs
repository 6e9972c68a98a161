//! Check Command
//!
//! Offline validation of generated sections.
//!
//! Usage:
//!   factweave check practice <file> [--strict]
//!   factweave check quality <dir-or-files>... [--expect outline,theory] [--format text|markdown|json]
//!   factweave check edit <editor-output.json> --pack <pack.json> [--level L2]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::cli::{Output, load_config};
use crate::context::ContextPack;
use crate::types::{FactKey, FactweaveError, Result, ResultExt};
use crate::validation::{
    EditorOutput, EnforcementLevel, LengthStatus, PracticeRules, QualityReporter, QualitySection,
    validate_grounding,
};

// =============================================================================
// Practice
// =============================================================================

pub fn practice(file: &Path, strict: bool, format: &str, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let rules = PracticeRules::from_config(&config.practice)?;
    let text = std::fs::read_to_string(file)
        .with_context_fn(|| format!("Failed to read {}", file.display()))?;
    let validation = rules.validate(&text);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&validation)?);
    } else {
        let out = Output::new();
        out.header(&format!("Practice check: {}", file.display()));
        println!("{}", validation.summary());
        let entities = validation.entities();
        if !entities.is_empty() {
            out.field("entities", entities.join(", "));
        }
        if validation.valid {
            out.success(&format!("Score {:.2}", validation.score));
        } else {
            out.error(&format!("Score {:.2}, required checks failed", validation.score));
        }
    }

    if strict && !validation.valid {
        return Err(FactweaveError::Context(format!(
            "{} failed the practice checks",
            file.display()
        )));
    }
    Ok(())
}

// =============================================================================
// Quality
// =============================================================================

pub fn quality(
    paths: &[PathBuf],
    expect: &[String],
    strict: bool,
    format: &str,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let reporter = QualityReporter::new(&config.quality)?;
    let sections = collect_sections(paths)?;
    let report = reporter.report(&sections, expect);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "markdown" => println!("{}", report.to_markdown()),
        "text" => {
            let out = Output::new();
            out.header("Quality report");
            out.field("sections", report.sections.len());
            out.field("words", report.total_words);
            out.field("repetition", format!("{:.3}", report.repetition_score));
            for metrics in &report.sections {
                out.check(
                    matches!(metrics.status, LengthStatus::Ok),
                    &format!("{}: {} words ({})", metrics.key, metrics.words, metrics.status),
                );
            }
            if report.is_clean() {
                out.success("No warnings");
            }
            for warning in &report.warnings {
                out.warning(&warning.to_string());
            }
        }
        other => {
            return Err(FactweaveError::Config(format!(
                "Unknown format '{}'. Valid values: text, markdown, json",
                other
            )));
        }
    }

    if strict && !report.is_clean() {
        return Err(FactweaveError::Context(format!(
            "{} quality warning(s)",
            report.warnings.len()
        )));
    }
    Ok(())
}

/// Markdown files named by their stem; directories contribute their `*.md` files
fn collect_sections(paths: &[PathBuf]) -> Result<Vec<QualitySection>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let pattern = format!("{}/*.md", glob::Pattern::escape(&path.to_string_lossy()));
            let entries = glob::glob(&pattern).map_err(|e| FactweaveError::Pattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            let mut found: Vec<PathBuf> = entries.filter_map(|e| e.ok()).collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }

    files
        .iter()
        .map(|file| {
            let key = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let text = std::fs::read_to_string(file)
                .with_context_fn(|| format!("Failed to read {}", file.display()))?;
            Ok(QualitySection::new(key, text))
        })
        .collect()
}

// =============================================================================
// Edit grounding
// =============================================================================

pub fn edit(
    output: &Path,
    pack: &Path,
    level: Option<EnforcementLevel>,
    config: Option<&Path>,
) -> Result<()> {
    let level = match level {
        Some(level) => level,
        None => load_config(config)?.editor.level,
    };
    let editor_output = EditorOutput::from_json(
        &std::fs::read_to_string(output).with_context("Failed to read editor output")?,
    )?;
    let pack: ContextPack = serde_json::from_str(
        &std::fs::read_to_string(pack).with_context("Failed to read context pack")?,
    )?;
    let offered: BTreeSet<FactKey> = pack.selected_keys.iter().cloned().collect();

    let violations = validate_grounding(&editor_output, &offered, level);

    let out = Output::new();
    out.header(&format!("Grounding check ({})", level));
    out.field("facts used", editor_output.facts_used.len());
    out.field("offered", offered.len());
    out.field("confidence", format!("{:.2}", editor_output.clamped_confidence()));

    if violations.is_empty() {
        out.success("Edit is grounded");
        Ok(())
    } else {
        for violation in &violations {
            out.error(&violation.to_string());
        }
        Err(FactweaveError::Grounding(violations))
    }
}
