//! Quality Reporter
//!
//! Document-level metrics over the section texts of one document: volume,
//! section length against thresholds, placeholder text, phrase repetition
//! and terminology consistency. Lower repetition is better.
//!
//! A non-empty section is a placeholder when it carries an unfinished-text
//! marker, is little more than a generic opening, states missing information
//! repeatedly, or is too thin to hold real content. The first rule that fires
//! is reported.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::terminology::{TerminologyConfig, TerminologyIssue};
use crate::config::QualityConfig;
use crate::constants::quality as quality_constants;
use crate::types::{FactweaveError, Result, round_to};

/// One section's text as seen by the reporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySection {
    pub key: String,
    pub text: String,
}

impl QualitySection {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthStatus {
    Ok,
    Empty,
    TooShort,
    TooLong,
}

impl fmt::Display for LengthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LengthStatus::Ok => "ok",
            LengthStatus::Empty => "empty",
            LengthStatus::TooShort => "too short",
            LengthStatus::TooLong => "too long",
        };
        f.write_str(label)
    }
}

/// Why a section reads as a placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PlaceholderReason {
    Marker { marker: String },
    GenericFiller,
    MissingInformation { markers: usize },
    ThinContent { chars: usize, sentences: usize },
}

impl fmt::Display for PlaceholderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marker { marker } => write!(f, "placeholder marker `{}`", marker),
            Self::GenericFiller => write!(f, "only generic introductory phrases"),
            Self::MissingInformation { markers } => {
                write!(f, "{} missing-information phrases", markers)
            }
            Self::ThinContent { chars, sentences } => {
                write!(f, "{} characters in {} sentence(s)", chars, sentences)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMetrics {
    pub key: String,
    pub chars: usize,
    pub words: usize,
    pub status: LengthStatus,
    pub placeholder: Option<PlaceholderReason>,
}

/// Phrase repeated across sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedPhrase {
    pub phrase: String,
    pub count: usize,
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityWarning {
    SectionTooShort { section: String, words: usize, min: usize },
    SectionTooLong { section: String, words: usize, max: usize },
    EmptySection { section: String },
    MissingSection { section: String },
    Placeholder { section: String, reason: PlaceholderReason },
    HighRepetition { score: f64, threshold: f64 },
    TerminologyInconsistency { terms: Vec<String>, occurrences: usize },
}

impl fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SectionTooShort { section, words, min } => {
                write!(f, "Section '{}' is too short: {} words (min {})", section, words, min)
            }
            Self::SectionTooLong { section, words, max } => {
                write!(f, "Section '{}' is too long: {} words (max {})", section, words, max)
            }
            Self::EmptySection { section } => write!(f, "Section '{}' is empty", section),
            Self::MissingSection { section } => write!(f, "Section '{}' is missing", section),
            Self::Placeholder { section, reason } => {
                write!(f, "Section '{}' looks like a placeholder: {}", section, reason)
            }
            Self::HighRepetition { score, threshold } => {
                write!(f, "Repetition score {:.2} exceeds {:.2}", score, threshold)
            }
            Self::TerminologyInconsistency { terms, occurrences } => write!(
                f,
                "Mixed terminology: {} ({} occurrences)",
                terms.join(" / "),
                occurrences
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_chars: usize,
    pub total_words: usize,
    pub sections: Vec<SectionMetrics>,
    /// Share of distinct n-grams repeated too often, in [0, 1]
    pub repetition_score: f64,
    pub repeated_phrases: Vec<RepeatedPhrase>,
    pub terminology: Vec<TerminologyIssue>,
    pub warnings: Vec<QualityWarning>,
}

impl QualityReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Quality Report\n\n");
        md.push_str(&format!(
            "- **Total**: {} words, {} characters\n- **Repetition score**: {:.2}\n\n",
            self.total_words, self.total_chars, self.repetition_score
        ));

        md.push_str("## Sections\n\n");
        md.push_str("| Section | Words | Characters | Status |\n");
        md.push_str("|---------|-------|------------|--------|\n");
        for s in &self.sections {
            let status = match s.status {
                LengthStatus::Ok => "✓ ok",
                LengthStatus::Empty => "✗ empty",
                LengthStatus::TooShort => "⚠ too short",
                LengthStatus::TooLong => "⚠ too long",
            };
            let placeholder = if s.placeholder.is_some() { ", placeholder" } else { "" };
            md.push_str(&format!(
                "| {} | {} | {} | {}{} |\n",
                s.key, s.words, s.chars, status, placeholder
            ));
        }

        if !self.repeated_phrases.is_empty() {
            md.push_str("\n## Repeated Phrases\n\n");
            for phrase in &self.repeated_phrases {
                md.push_str(&format!(
                    "- \"{}\" ×{} in {}\n",
                    phrase.phrase,
                    phrase.count,
                    phrase.sections.join(", ")
                ));
            }
        }

        if !self.terminology.is_empty() {
            md.push_str("\n## Terminology\n\n");
            for issue in &self.terminology {
                md.push_str(&format!("- {}\n", issue.terms_used.join(" / ")));
                for loc in &issue.locations {
                    md.push_str(&format!("  - `{}` in {} line {}\n", loc.term, loc.section, loc.line));
                }
            }
        }

        if !self.warnings.is_empty() {
            md.push_str("\n## Warnings\n\n");
            for warning in &self.warnings {
                md.push_str(&format!("- {}\n", warning));
            }
        }
        md
    }
}

pub struct QualityReporter {
    min_words: usize,
    max_words: usize,
    ngram_size: usize,
    repetition_threshold: f64,
    terminology: TerminologyConfig,
    word: Regex,
    /// Source pattern next to its compiled form, for reporting
    placeholder_markers: Vec<(String, Regex)>,
    filler_patterns: Vec<Regex>,
    /// Lowercased
    missing_info_markers: Vec<String>,
    min_content_chars: usize,
    min_section_chars: usize,
}

impl QualityReporter {
    pub fn new(config: &QualityConfig) -> Result<Self> {
        Ok(Self {
            min_words: config.min_words,
            max_words: config.max_words,
            ngram_size: config.ngram_size.max(1),
            repetition_threshold: config.repetition_threshold,
            terminology: TerminologyConfig::new(&config.synonym_groups)?,
            word: FactweaveError::compile(r"\b\w+\b")?,
            placeholder_markers: config
                .placeholder_markers
                .iter()
                .map(|p| -> Result<(String, Regex)> {
                    Ok((p.clone(), FactweaveError::compile(&format!("(?i){}", p))?))
                })
                .collect::<Result<_>>()?,
            filler_patterns: config
                .filler_patterns
                .iter()
                .map(|p| FactweaveError::compile(&format!("(?im)^(?:{})", p)))
                .collect::<Result<_>>()?,
            missing_info_markers: config
                .missing_info_markers
                .iter()
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
            min_content_chars: config.min_content_chars,
            min_section_chars: config.min_section_chars,
        })
    }

    /// First placeholder rule `text` trips, if any
    fn placeholder(&self, text: &str) -> Option<PlaceholderReason> {
        let text = text.trim();

        if let Some((marker, _)) = self
            .placeholder_markers
            .iter()
            .find(|(_, re)| re.is_match(text))
        {
            return Some(PlaceholderReason::Marker {
                marker: marker.clone(),
            });
        }

        for filler in &self.filler_patterns {
            if filler.find(text).is_some_and(|m| m.start() == 0)
                && filler.replace_all(text, "").trim().chars().count() < self.min_content_chars
            {
                return Some(PlaceholderReason::GenericFiller);
            }
        }

        let lower = text.to_lowercase();
        let missing = self
            .missing_info_markers
            .iter()
            .filter(|m| lower.contains(m.as_str()))
            .count();
        if missing >= quality_constants::MISSING_INFO_LIMIT {
            return Some(PlaceholderReason::MissingInformation { markers: missing });
        }

        let chars = text.chars().count();
        let sentences = text
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count();
        if chars < self.min_content_chars
            || (sentences <= quality_constants::MAX_PLACEHOLDER_SENTENCES
                && chars < self.min_section_chars)
        {
            return Some(PlaceholderReason::ThinContent { chars, sentences });
        }
        None
    }

    fn words(&self, text: &str) -> Vec<String> {
        self.word
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    /// Report over `sections`; keys in `expected` without a section are missing
    pub fn report(&self, sections: &[QualitySection], expected: &[String]) -> QualityReport {
        let mut warnings = Vec::new();
        let mut metrics = Vec::with_capacity(sections.len());
        let mut section_words = Vec::with_capacity(sections.len());

        for section in sections {
            let words = self.words(&section.text);
            let count = words.len();
            let status = if section.text.trim().is_empty() {
                warnings.push(QualityWarning::EmptySection {
                    section: section.key.clone(),
                });
                LengthStatus::Empty
            } else if (count as f64) < self.min_words as f64 * 0.5 {
                warnings.push(QualityWarning::SectionTooShort {
                    section: section.key.clone(),
                    words: count,
                    min: self.min_words,
                });
                LengthStatus::TooShort
            } else if (count as f64) > self.max_words as f64 * 1.5 {
                warnings.push(QualityWarning::SectionTooLong {
                    section: section.key.clone(),
                    words: count,
                    max: self.max_words,
                });
                LengthStatus::TooLong
            } else {
                LengthStatus::Ok
            };

            let placeholder = match status {
                LengthStatus::Empty => None,
                _ => self.placeholder(&section.text),
            };
            if let Some(reason) = &placeholder {
                warnings.push(QualityWarning::Placeholder {
                    section: section.key.clone(),
                    reason: reason.clone(),
                });
            }

            metrics.push(SectionMetrics {
                key: section.key.clone(),
                chars: section.text.chars().count(),
                words: count,
                status,
                placeholder,
            });
            section_words.push((section.key.as_str(), words));
        }

        let present: BTreeSet<&str> = sections.iter().map(|s| s.key.as_str()).collect();
        for key in expected {
            if !present.contains(key.as_str()) {
                warnings.push(QualityWarning::MissingSection {
                    section: key.clone(),
                });
            }
        }

        let repetition_score = self.repetition_score(&section_words);
        if repetition_score > self.repetition_threshold {
            warnings.push(QualityWarning::HighRepetition {
                score: repetition_score,
                threshold: self.repetition_threshold,
            });
        }

        let terminology = self
            .terminology
            .check(sections.iter().map(|s| (s.key.as_str(), s.text.as_str())));
        for issue in &terminology {
            warnings.push(QualityWarning::TerminologyInconsistency {
                terms: issue.terms_used.clone(),
                occurrences: issue.locations.len(),
            });
        }

        QualityReport {
            total_chars: metrics.iter().map(|m| m.chars).sum(),
            total_words: metrics.iter().map(|m| m.words).sum(),
            sections: metrics,
            repetition_score,
            repeated_phrases: cross_section_repeats(&section_words),
            terminology,
            warnings,
        }
    }

    /// Share of distinct n-grams occurring more than the allowed number of times.
    /// N-grams never span two sections.
    fn repetition_score(&self, sections: &[(&str, Vec<String>)]) -> f64 {
        let mut counts: HashMap<&[String], usize> = HashMap::new();
        let mut total = 0usize;
        for (_, words) in sections {
            for gram in words.windows(self.ngram_size) {
                *counts.entry(gram).or_default() += 1;
                total += 1;
            }
        }
        if total < quality_constants::MIN_NGRAMS || counts.is_empty() {
            return 0.0;
        }
        let repeated = counts
            .values()
            .filter(|&&c| c > quality_constants::REPEAT_OCCURRENCES)
            .count();
        round_to(repeated as f64 / counts.len() as f64, 3)
    }
}

/// Longest-first phrases that occur in more than one section often enough.
/// A shorter phrase inside an already reported one is skipped.
fn cross_section_repeats(sections: &[(&str, Vec<String>)]) -> Vec<RepeatedPhrase> {
    let mut reported: Vec<RepeatedPhrase> = Vec::new();
    for n in (quality_constants::CROSS_MIN_NGRAM..=quality_constants::CROSS_MAX_NGRAM).rev() {
        let mut found: BTreeMap<String, (usize, BTreeSet<&str>)> = BTreeMap::new();
        for (key, words) in sections {
            for gram in words.windows(n) {
                let entry = found.entry(gram.join(" ")).or_default();
                entry.0 += 1;
                entry.1.insert(*key);
            }
        }
        let fresh: Vec<RepeatedPhrase> = found
            .into_iter()
            .filter(|(phrase, (count, keys))| {
                *count >= quality_constants::CROSS_MIN_COUNT
                    && keys.len() > 1
                    && !reported.iter().any(|r| r.phrase.contains(phrase.as_str()))
            })
            .map(|(phrase, (count, keys))| RepeatedPhrase {
                phrase,
                count,
                sections: keys.into_iter().map(str::to_string).collect(),
            })
            .collect();
        reported.extend(fresh);
    }
    reported.sort_by(|a, b| b.count.cmp(&a.count).then(a.phrase.cmp(&b.phrase)));
    reported
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> QualityConfig {
        QualityConfig {
            min_words: 10,
            max_words: 40,
            ..Default::default()
        }
    }

    fn prose(words: usize, seed: &str) -> String {
        (0..words).map(|i| format!("{}{}", seed, i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_length_thresholds_and_missing() {
        let reporter = QualityReporter::new(&config()).unwrap();
        let sections = vec![
            QualitySection::new("outline", prose(20, "o")),
            QualitySection::new("theory", prose(3, "t")),
            QualitySection::new("practice", prose(70, "p")),
            QualitySection::new("conclusion", "   "),
        ];
        let expected: Vec<String> = ["outline", "theory", "practice", "conclusion", "appendix"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = reporter.report(&sections, &expected);

        let statuses: Vec<_> = report.sections.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                LengthStatus::Ok,
                LengthStatus::TooShort,
                LengthStatus::TooLong,
                LengthStatus::Empty
            ]
        );
        assert_eq!(report.total_words, 93);
        assert!(report.warnings.contains(&QualityWarning::MissingSection {
            section: "appendix".to_string()
        }));
        assert_eq!(report.repetition_score, 0.0);
    }

    #[test]
    fn test_repetition_detected_across_sections() {
        let phrase = "the order service stores every order";
        let text = format!("{p}. {p}. {p}. unique words here.", p = phrase);
        let reporter = QualityReporter::new(&config()).unwrap();
        let report = reporter.report(
            &[
                QualitySection::new("theory", text.clone()),
                QualitySection::new("practice", text),
            ],
            &[],
        );
        assert!(report.repetition_score > 0.1);
        assert!(
            report
                .warnings
                .iter()
                .any(|w| matches!(w, QualityWarning::HighRepetition { .. }))
        );
        let top = &report.repeated_phrases[0];
        assert_eq!(top.sections, vec!["practice", "theory"]);
        assert!(top.count >= 3);
        assert!(
            !report
                .repeated_phrases
                .iter()
                .any(|p| p.phrase == "order service stores every")
        );
    }

    #[test]
    fn test_short_documents_are_not_scored() {
        let reporter = QualityReporter::new(&config()).unwrap();
        let report = reporter.report(&[QualitySection::new("a", "x x x x x")], &[]);
        assert_eq!(report.repetition_score, 0.0);
    }

    /// Distinct sentences with no repeated n-grams
    fn sentences(n: usize) -> String {
        (0..n)
            .map(|i| format!("Step{i} records value{i} for account{i}."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn reporter() -> QualityReporter {
        QualityReporter::new(&QualityConfig {
            max_words: 200,
            ..config()
        })
        .unwrap()
    }

    fn placeholder_of(text: &str) -> Option<PlaceholderReason> {
        let report = reporter().report(&[QualitySection::new("theory", text)], &[]);
        report.sections[0].placeholder.clone()
    }

    #[test]
    fn test_substantive_section_is_clean() {
        let report = reporter().report(&[QualitySection::new("theory", sentences(20))], &[]);
        assert_eq!(report.sections[0].placeholder, None);
        assert_eq!(report.sections[0].status, LengthStatus::Ok);
        assert!(report.is_clean(), "{:?}", report.warnings);
    }

    #[test]
    fn test_placeholder_markers_flag_long_sections() {
        let lorem = format!("Lorem ipsum dolor sit amet. {}", sentences(20));
        assert_eq!(
            placeholder_of(&lorem),
            Some(PlaceholderReason::Marker {
                marker: "Lorem ipsum".to_string()
            })
        );

        let todo = format!("{}\n\nTODO: fill in the error handling part", sentences(20));
        assert!(matches!(
            placeholder_of(&todo),
            Some(PlaceholderReason::Marker { ref marker }) if marker.contains("TODO")
        ));

        let bracketed = format!("{} [todo] {}", sentences(10), sentences(10));
        assert!(matches!(placeholder_of(&bracketed), Some(PlaceholderReason::Marker { .. })));
    }

    #[test]
    fn test_generic_filler_and_missing_information() {
        assert_eq!(
            placeholder_of("В данном разделе рассматривается архитектура."),
            Some(PlaceholderReason::GenericFiller)
        );
        assert_eq!(
            placeholder_of(&format!("In this section. {}", sentences(20))),
            None
        );

        let missing = format!(
            "Нет данных о нагрузке. Данные отсутствуют для модуля оплаты. {}",
            sentences(20)
        );
        assert_eq!(
            placeholder_of(&missing),
            Some(PlaceholderReason::MissingInformation { markers: 2 })
        );
        let single = format!("Нет данных о нагрузке. {}", sentences(20));
        assert_eq!(placeholder_of(&single), None);
    }

    #[test]
    fn test_thin_sections_are_placeholders_but_empty_ones_are_not() {
        let report = reporter().report(
            &[
                QualitySection::new("outline", "Short note."),
                QualitySection::new("conclusion", ""),
            ],
            &[],
        );
        assert_eq!(
            report.sections[0].placeholder,
            Some(PlaceholderReason::ThinContent {
                chars: 11,
                sentences: 1
            })
        );
        assert_eq!(report.sections[1].placeholder, None);
        assert!(report.warnings.contains(&QualityWarning::Placeholder {
            section: "outline".to_string(),
            reason: PlaceholderReason::ThinContent {
                chars: 11,
                sentences: 1
            },
        }));
        assert!(
            !report
                .warnings
                .iter()
                .any(|w| matches!(w, QualityWarning::Placeholder { section, .. } if section == "conclusion"))
        );

        let md = report.to_markdown();
        assert!(md.contains("placeholder"));

        let lenient = QualityReporter::new(&QualityConfig {
            min_content_chars: 0,
            min_section_chars: 0,
            ..config()
        })
        .unwrap();
        let report = lenient.report(&[QualitySection::new("outline", "Short note.")], &[]);
        assert_eq!(report.sections[0].placeholder, None);
    }

    #[test]
    fn test_terminology_warning_and_markdown() {
        let reporter = QualityReporter::new(&QualityConfig {
            synonym_groups: vec![vec!["customer".to_string(), "client".to_string()]],
            ..config()
        })
        .unwrap();
        let report = reporter.report(
            &[
                QualitySection::new("theory", format!("A customer signs up. {}", prose(10, "t"))),
                QualitySection::new("practice", format!("The client pays. {}", prose(10, "p"))),
            ],
            &[],
        );
        assert_eq!(report.terminology.len(), 1);
        assert_eq!(report.terminology[0].locations.len(), 2);

        let md = report.to_markdown();
        assert!(md.contains("| theory |"));
        assert!(md.contains("Mixed terminology: customer / client"));
        assert!(md.contains("`client` in practice line 1"));
    }
}
