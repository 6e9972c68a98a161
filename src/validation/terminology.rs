//! Terminology
//!
//! Two related tools built once from configuration and injected where needed:
//! - `Glossary` rewrites known variants to their canonical term before an edit
//! - `TerminologyConfig` finds documents that mix terms of one synonym group

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::GlossaryTerm;
use crate::types::{FactweaveError, Result};

/// Case-insensitive whole-word pattern for a literal term
fn term_pattern(term: &str) -> Result<Regex> {
    FactweaveError::compile(&format!(r"(?i)\b{}\b", regex::escape(term)))
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

// =============================================================================
// Glossary normalization
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermReplacement {
    pub original: String,
    pub replacement: String,
    /// Byte offset in the text before normalization
    pub position: usize,
}

#[derive(Debug, Clone)]
struct CompiledVariant {
    canonical: String,
    pattern: Regex,
}

#[derive(Debug, Clone, Default)]
pub struct Glossary {
    variants: Vec<CompiledVariant>,
}

impl Glossary {
    pub fn new(terms: &[GlossaryTerm]) -> Result<Self> {
        let mut variants = Vec::new();
        for term in terms {
            for variant in &term.variants {
                if variant.trim().is_empty() || variant.eq_ignore_ascii_case(&term.canonical) {
                    continue;
                }
                variants.push(CompiledVariant {
                    canonical: term.canonical.clone(),
                    pattern: term_pattern(variant)?,
                });
            }
        }
        Ok(Self { variants })
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Replace every variant with its canonical term.
    ///
    /// Matches are collected on the original text; where two overlap, the one
    /// starting first (then the longer one) wins.
    pub fn normalize(&self, text: &str) -> (String, Vec<TermReplacement>) {
        let mut hits: Vec<(usize, usize, &str)> = Vec::new();
        for variant in &self.variants {
            for m in variant.pattern.find_iter(text) {
                if m.as_str() != variant.canonical {
                    hits.push((m.start(), m.end(), &variant.canonical));
                }
            }
        }
        hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut out = String::with_capacity(text.len());
        let mut replacements = Vec::new();
        let mut cursor = 0;
        for (start, end, canonical) in hits {
            if start < cursor {
                continue;
            }
            out.push_str(&text[cursor..start]);
            out.push_str(canonical);
            replacements.push(TermReplacement {
                original: text[start..end].to_string(),
                replacement: canonical.to_string(),
                position: start,
            });
            cursor = end;
        }
        out.push_str(&text[cursor..]);
        (out, replacements)
    }
}

// =============================================================================
// Synonym groups
// =============================================================================

/// Where a term of a synonym group occurs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermLocation {
    pub section: String,
    pub term: String,
    pub line: usize,
    pub offset: usize,
}

/// A document used two or more terms of the same group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminologyIssue {
    pub group: Vec<String>,
    pub terms_used: Vec<String>,
    pub locations: Vec<TermLocation>,
}

#[derive(Debug, Clone)]
struct CompiledGroup {
    terms: Vec<(String, Regex)>,
}

#[derive(Debug, Clone, Default)]
pub struct TerminologyConfig {
    groups: Vec<CompiledGroup>,
}

impl TerminologyConfig {
    pub fn new(groups: &[Vec<String>]) -> Result<Self> {
        let groups = groups
            .iter()
            .map(|group| {
                let terms = group
                    .iter()
                    .map(|term| Ok((term.clone(), term_pattern(term)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(CompiledGroup { terms })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }

    /// Inconsistencies across `(section, text)` pairs, in group order
    pub fn check<'a, I>(&self, sections: I) -> Vec<TerminologyIssue>
    where
        I: IntoIterator<Item = (&'a str, &'a str)> + Clone,
    {
        let mut issues = Vec::new();
        for group in &self.groups {
            let mut locations = Vec::new();
            for (section, text) in sections.clone() {
                for (term, pattern) in &group.terms {
                    locations.extend(pattern.find_iter(text).map(|m| TermLocation {
                        section: section.to_string(),
                        term: term.clone(),
                        line: line_of(text, m.start()),
                        offset: m.start(),
                    }));
                }
            }

            let terms_used: Vec<String> = group
                .terms
                .iter()
                .map(|(term, _)| term)
                .filter(|term| locations.iter().any(|l| &l.term == *term))
                .cloned()
                .collect();
            if terms_used.len() < 2 {
                continue;
            }

            locations.sort_by(|a, b| {
                a.section
                    .cmp(&b.section)
                    .then(a.offset.cmp(&b.offset))
                    .then(a.term.cmp(&b.term))
            });
            issues.push(TerminologyIssue {
                group: group.terms.iter().map(|(t, _)| t.clone()).collect(),
                terms_used,
                locations,
            });
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glossary() -> Glossary {
        Glossary::new(&[
            GlossaryTerm {
                canonical: "API gateway".to_string(),
                variants: vec!["gateway service".to_string(), "api gateway".to_string()],
            },
            GlossaryTerm {
                canonical: "database".to_string(),
                variants: vec!["DB".to_string(), "data store".to_string()],
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_normalize_replaces_variants_with_positions() {
        let text = "The Gateway Service talks to the db. Another DB holds sessions.";
        let (out, replacements) = glossary().normalize(text);
        assert_eq!(
            out,
            "The API gateway talks to the database. Another database holds sessions."
        );
        assert_eq!(replacements.len(), 3);
        assert_eq!(replacements[0].original, "Gateway Service");
        assert_eq!(replacements[0].position, 4);
        assert_eq!(replacements[1].original, "db");
    }

    #[test]
    fn test_normalize_whole_words_only() {
        let (out, replacements) = glossary().normalize("DBMS and dbx stay untouched");
        assert_eq!(out, "DBMS and dbx stay untouched");
        assert!(replacements.is_empty());
    }

    #[test]
    fn test_canonical_variant_is_skipped() {
        let (out, replacements) = glossary().normalize("The API gateway is fine");
        assert_eq!(out, "The API gateway is fine");
        assert!(replacements.is_empty());
    }

    #[test]
    fn test_synonym_group_inconsistency() {
        let config = TerminologyConfig::new(&[
            vec!["endpoint".to_string(), "route".to_string(), "handler".to_string()],
            vec!["user".to_string(), "customer".to_string()],
        ])
        .unwrap();
        let sections = [
            ("theory", "Each endpoint is versioned.\nA user logs in."),
            ("practice", "The route /orders lists orders for a user."),
        ];
        let issues = config.check(sections.iter().map(|(s, t)| (*s, *t)));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].terms_used, vec!["endpoint", "route"]);
        assert_eq!(issues[0].locations.len(), 2);
        assert_eq!(issues[0].locations[0].section, "practice");
        assert_eq!(issues[0].locations[1].line, 1);
    }
}
