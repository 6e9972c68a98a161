//! Practice Content Validator
//!
//! Each structural requirement is a `PracticeRule`: a set of patterns, a score
//! weight and a required flag. Adding a guardrail means adding a rule.
//!
//! Validity is a two-part gate. The score sums the weights of passed rules,
//! but a text is valid only when every required rule passes, whatever the
//! score.

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::PracticeConfig;
use crate::constants::practice as practice_constants;
use crate::types::{FactweaveError, Result, round_to};

/// Multi-word capitalized identifiers such as `OrderService`
const ENTITY_PATTERN: &str = r"\b[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+\b";

const ALGORITHM_PATTERNS: &[&str] = &[
    // "## Algorithm", "**Steps:**", "### Алгоритм", "Шаги"
    r"(?im)^[ \t]*(?:#{1,6}[ \t]*|\*\*)?(?:algorithm|steps?|алгоритм|шаги?)\b[^\n]*$",
    // "**Алгоритм обработки:**" anywhere in a line
    r"(?i)\*\*алгоритм\b",
    // "Follow these steps:", "Шаги обработки:"
    r"(?i)\b(?:steps?|шаги?)\b[^\n]*:",
    // Numbered step carrying a colon: "1. Validate: the cart"
    r"(?m)^[ \t]*\d+\.[ \t]+\w+[^\n]*:",
    // Input ... Output, in that order
    r"(?is)\binput\**[ \t]*:.*?\boutput\**[ \t]*:",
];

/// Header row directly followed by a separator row
const TABLE_PATTERN: &str = r"(?m)^[ \t]*\|[^\n]*\|[ \t]*\r?\n[ \t]*\|(?:[ \t]*:?-+:?[ \t]*\|)+[ \t]*$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeCheck {
    Entities,
    Algorithm,
    Table,
}

impl std::fmt::Display for PracticeCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entities => write!(f, "entities"),
            Self::Algorithm => write!(f, "algorithm"),
            Self::Table => write!(f, "table"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PracticeRule {
    pub check: PracticeCheck,
    patterns: Vec<Regex>,
    pub weight: f64,
    pub required: bool,
    /// Distinct matched texts needed to pass
    pub min_matches: usize,
}

impl PracticeRule {
    pub fn new(check: PracticeCheck, patterns: &[String], weight: f64, required: bool) -> Result<Self> {
        Ok(Self {
            check,
            patterns: patterns
                .iter()
                .map(|p| FactweaveError::compile(p))
                .collect::<Result<_>>()?,
            weight,
            required,
            min_matches: 1,
        })
    }

    pub fn with_min_matches(mut self, min_matches: usize) -> Self {
        self.min_matches = min_matches;
        self
    }

    fn evaluate(&self, text: &str) -> CheckOutcome {
        let mut matches: Vec<MatchSpan> = self
            .patterns
            .iter()
            .flat_map(|p| p.find_iter(text))
            .map(|m| MatchSpan {
                start: m.start(),
                end: m.end(),
                text: m.as_str().trim().to_string(),
            })
            .collect();
        matches.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        matches.dedup();

        let distinct = matches.iter().map(|m| m.text.as_str()).collect::<BTreeSet<_>>().len();
        CheckOutcome {
            check: self.check,
            passed: distinct >= self.min_matches.max(1),
            required: self.required,
            weight: self.weight,
            distinct,
            matches,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check: PracticeCheck,
    pub passed: bool,
    pub required: bool,
    pub weight: f64,
    /// Distinct matched texts
    pub distinct: usize,
    pub matches: Vec<MatchSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeValidation {
    /// Sum of passed weights, in [0, 1]
    pub score: f64,
    /// All required checks passed
    pub valid: bool,
    pub checks: Vec<CheckOutcome>,
    pub warnings: Vec<String>,
}

impl PracticeValidation {
    pub fn check(&self, check: PracticeCheck) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.check == check)
    }

    pub fn passed(&self, check: PracticeCheck) -> bool {
        self.check(check).is_some_and(|c| c.passed)
    }

    /// Distinct entity names found, sorted
    pub fn entities(&self) -> Vec<&str> {
        self.check(PracticeCheck::Entities)
            .map(|c| {
                c.matches
                    .iter()
                    .map(|m| m.text.as_str())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Human readable summary
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "{} practice section (score {:.2})",
            if self.valid { "Valid" } else { "Invalid" },
            self.score
        )];
        for check in &self.checks {
            lines.push(format!(
                "  {} {}{}: {} match(es)",
                if check.passed { "✓" } else { "✗" },
                check.check,
                if check.required { " (required)" } else { "" },
                check.distinct
            ));
        }
        for warning in &self.warnings {
            lines.push(format!("  ! {}", warning));
        }
        lines.join("\n")
    }
}

/// Immutable rule set, built once from configuration
#[derive(Debug, Clone)]
pub struct PracticeRules {
    rules: Vec<PracticeRule>,
}

impl PracticeRules {
    pub fn new(rules: Vec<PracticeRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &PracticeConfig) -> Result<Self> {
        let mut entity_patterns = vec![ENTITY_PATTERN.to_string()];
        entity_patterns.extend(
            config
                .domain_terms
                .iter()
                .filter(|t| !t.trim().is_empty())
                .map(|t| format!(r"\b{}\b", regex::escape(t.trim()))),
        );
        let algorithm: Vec<String> = ALGORITHM_PATTERNS.iter().map(|p| p.to_string()).collect();

        Ok(Self::new(vec![
            PracticeRule::new(
                PracticeCheck::Entities,
                &entity_patterns,
                practice_constants::ENTITY_WEIGHT,
                config.require_entities,
            )?
            .with_min_matches(config.min_entities),
            PracticeRule::new(
                PracticeCheck::Algorithm,
                &algorithm,
                practice_constants::ALGORITHM_WEIGHT,
                config.require_algorithm,
            )?,
            PracticeRule::new(
                PracticeCheck::Table,
                &[TABLE_PATTERN.to_string()],
                practice_constants::TABLE_WEIGHT,
                config.require_table,
            )?,
        ]))
    }

    pub fn rules(&self) -> &[PracticeRule] {
        &self.rules
    }

    pub fn validate(&self, text: &str) -> PracticeValidation {
        let checks: Vec<CheckOutcome> = self.rules.iter().map(|r| r.evaluate(text)).collect();

        let score: f64 = checks.iter().filter(|c| c.passed).map(|c| c.weight).sum();
        let valid = checks.iter().all(|c| c.passed || !c.required);

        let warnings = checks
            .iter()
            .filter(|c| !c.passed && c.required)
            .map(|c| match c.check {
                PracticeCheck::Entities => {
                    let needed = self
                        .rules
                        .iter()
                        .find(|r| r.check == c.check)
                        .map_or(1, |r| r.min_matches);
                    format!("Too few concrete entities: {} of {} required", c.distinct, needed)
                }
                PracticeCheck::Algorithm => "No algorithm or numbered steps found".to_string(),
                PracticeCheck::Table => "No markdown table found".to_string(),
            })
            .collect();

        PracticeValidation {
            score: round_to(score.clamp(0.0, 1.0), 2),
            valid,
            checks,
            warnings,
        }
    }
}
