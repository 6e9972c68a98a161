use std::collections::BTreeMap;

use super::{DetectorInput, Facet, FactDetector, extension};
use crate::constants::facts as facts_constants;
use crate::types::{Evidence, LanguageFact, Result, log_filter_warn, round_to};

/// Map a lowercase file extension to a language name
fn language_for(ext: &str) -> Option<&'static str> {
    let lang = match ext {
        "py" | "pyi" => "python",
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "rb" => "ruby",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "swift" => "swift",
        "scala" => "scala",
        "vue" => "vue",
        "svelte" => "svelte",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" | "sass" => "scss",
        "sh" | "bash" | "zsh" => "shell",
        "sql" => "sql",
        _ => return None,
    };
    Some(lang)
}

#[derive(Default)]
struct Tally {
    lines: u64,
    files: u64,
    samples: Vec<String>,
}

/// Language breakdown by recognized code lines
pub struct LanguageDetector;

impl FactDetector for LanguageDetector {
    fn name(&self) -> &'static str {
        "languages"
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Facet> {
        let mut tallies: BTreeMap<&'static str, Tally> = BTreeMap::new();

        for path in input.files {
            let Some(lang) = extension(path).as_deref().and_then(language_for) else {
                continue;
            };
            let Some(lines) = log_filter_warn(input.tree.line_count(path), "Line count failed")
            else {
                continue;
            };

            let tally = tallies.entry(lang).or_default();
            tally.lines += lines;
            tally.files += 1;
            if tally.samples.len() < facts_constants::MAX_LANGUAGE_EVIDENCE {
                tally.samples.push(path.clone());
            }
        }

        let total: u64 = tallies.values().map(|t| t.lines).sum();

        let mut languages: Vec<LanguageFact> = tallies
            .into_iter()
            .map(|(name, tally)| LanguageFact {
                name: name.to_string(),
                ratio: if total == 0 {
                    0.0
                } else {
                    round_to(
                        tally.lines as f64 / total as f64,
                        facts_constants::RATIO_PRECISION,
                    )
                },
                lines_of_code: tally.lines,
                files: tally.files,
                evidence: tally.samples.into_iter().map(Evidence::file).collect(),
            })
            .collect();

        // Lines desc, then file count desc, then name asc
        languages.sort_by(|a, b| {
            b.lines_of_code
                .cmp(&a.lines_of_code)
                .then(b.files.cmp(&a.files))
                .then(a.name.cmp(&b.name))
        });

        Ok(Facet::Languages(languages))
    }
}
