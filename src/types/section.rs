//! Document sections and their dependency graph
//!
//! ```text
//! outline ──► theory ──► practice ──► conclusion
//!    │           └──────────────────────▲
//!    └──────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::FactweaveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Outline,
    Theory,
    Practice,
    Conclusion,
}

impl SectionKind {
    /// Topological order of the fixed dependency graph
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Outline,
        SectionKind::Theory,
        SectionKind::Practice,
        SectionKind::Conclusion,
    ];

    /// Direct prerequisites
    pub fn dependencies(&self) -> &'static [SectionKind] {
        match self {
            SectionKind::Outline => &[],
            SectionKind::Theory => &[SectionKind::Outline],
            SectionKind::Practice => &[SectionKind::Outline, SectionKind::Theory],
            SectionKind::Conclusion => &[
                SectionKind::Outline,
                SectionKind::Theory,
                SectionKind::Practice,
            ],
        }
    }

    /// Sections that read this one, directly or transitively
    pub fn downstream(&self) -> Vec<SectionKind> {
        Self::ALL
            .iter()
            .copied()
            .filter(|other| other.depends_on(*self))
            .collect()
    }

    pub fn depends_on(&self, other: SectionKind) -> bool {
        self.dependencies()
            .iter()
            .any(|dep| *dep == other || dep.depends_on(other))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Outline => "outline",
            SectionKind::Theory => "theory",
            SectionKind::Practice => "practice",
            SectionKind::Conclusion => "conclusion",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = FactweaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "outline" => Ok(SectionKind::Outline),
            "theory" => Ok(SectionKind::Theory),
            "practice" => Ok(SectionKind::Practice),
            "conclusion" => Ok(SectionKind::Conclusion),
            other => Err(FactweaveError::UnknownSection(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_topological() {
        for (idx, kind) in SectionKind::ALL.iter().enumerate() {
            for dep in kind.dependencies() {
                let dep_idx = SectionKind::ALL.iter().position(|k| k == dep).unwrap();
                assert!(dep_idx < idx, "{} must precede {}", dep, kind);
            }
        }
    }

    #[test]
    fn test_downstream() {
        assert_eq!(
            SectionKind::Theory.downstream(),
            vec![SectionKind::Practice, SectionKind::Conclusion]
        );
        assert_eq!(SectionKind::Practice.downstream(), vec![SectionKind::Conclusion]);
        assert!(SectionKind::Conclusion.downstream().is_empty());
    }

    #[test]
    fn test_parse() {
        assert_eq!("Theory".parse::<SectionKind>().unwrap(), SectionKind::Theory);
        assert!(matches!(
            "appendix".parse::<SectionKind>(),
            Err(FactweaveError::UnknownSection(_))
        ));
    }
}
