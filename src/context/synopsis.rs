//! Bounded summaries of already generated sections
//!
//! A dependent section never sees the full text of its prerequisites, only a
//! short bullet synopsis. Bullets come from list items in the source text;
//! when there are too few, leading sentences fill in.

use serde::{Deserialize, Serialize};

use crate::constants::context as context_constants;
use crate::types::{SectionKind, truncate_chars};

/// How much of the outline a dependent section receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutlineExcerpt {
    /// Bullet synopsis like any other section
    #[default]
    Full,
    /// Markdown headings only
    HeadingsOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synopsis {
    pub section: SectionKind,
    pub bullets: Vec<String>,
}

fn list_item(line: &str) -> Option<&str> {
    let line = line.trim();
    ["- ", "* ", "• "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .or_else(|| {
            // "1. item"
            let (num, rest) = line.split_once(". ")?;
            (!num.is_empty() && num.chars().all(|c| c.is_ascii_digit())).then_some(rest)
        })
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn heading(line: &str) -> Option<&str> {
    let line = line.trim();
    line.starts_with('#')
        .then(|| line.trim_start_matches('#').trim())
        .filter(|h| !h.is_empty())
}

/// Sentences from prose lines (not headings, list items, tables or code fences)
fn sentences(text: &str) -> Vec<String> {
    let prose: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && heading(line).is_none()
                && list_item(line).is_none()
                && !line.starts_with('|')
                && !line.starts_with("```")
        })
        .collect();
    prose
        .join(" ")
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.len() > 1)
        .map(str::to_string)
        .collect()
}

impl Synopsis {
    /// Bullet synopsis of `text`, at most `max_chars` when rendered
    pub fn from_text(section: SectionKind, text: &str, max_chars: usize) -> Self {
        let mut bullets: Vec<String> = text
            .lines()
            .filter_map(list_item)
            .take(context_constants::SYNOPSIS_MAX_BULLETS)
            .map(str::to_string)
            .collect();

        if bullets.len() < context_constants::SYNOPSIS_MIN_BULLETS {
            let missing = context_constants::SYNOPSIS_MIN_BULLETS - bullets.len();
            bullets.extend(sentences(text).into_iter().take(missing));
        }

        Self { section, bullets }.bounded(max_chars)
    }

    /// Headings of `text` as bullets
    pub fn headings(section: SectionKind, text: &str, max_chars: usize) -> Self {
        let bullets = text
            .lines()
            .filter_map(heading)
            .take(context_constants::SYNOPSIS_MAX_BULLETS)
            .map(str::to_string)
            .collect();
        Self { section, bullets }.bounded(max_chars)
    }

    pub fn excerpt(section: SectionKind, text: &str, mode: OutlineExcerpt, max_chars: usize) -> Self {
        match (section, mode) {
            (SectionKind::Outline, OutlineExcerpt::HeadingsOnly) => {
                Self::headings(section, text, max_chars)
            }
            _ => Self::from_text(section, text, max_chars),
        }
    }

    /// Drop or cut bullets until the rendered bullets fit `max_chars`
    pub fn bounded(mut self, max_chars: usize) -> Self {
        let mut used = 0;
        let mut kept = Vec::new();
        for bullet in self.bullets.drain(..) {
            // "- " prefix and newline
            let overhead = 3;
            let remaining = max_chars.saturating_sub(used + overhead);
            if remaining < 4 {
                break;
            }
            let bullet = truncate_chars(&bullet, remaining);
            used += bullet.chars().count() + overhead;
            kept.push(bullet);
        }
        self.bullets = kept;
        self
    }

    pub fn len_chars(&self) -> usize {
        self.bullets.iter().map(|b| b.chars().count() + 3).sum()
    }

    pub fn render(&self) -> String {
        let mut out = format!("### {}\n", self.section);
        for bullet in &self.bullets {
            out.push_str("- ");
            out.push_str(bullet);
            out.push('\n');
        }
        out
    }
}
