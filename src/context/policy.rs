//! Per-section fact ranking

use std::cmp::Ordering;

use crate::types::{FactKind, FactRecord, SectionKind};

/// Evidence beyond this many pointers adds no further richness
const RICHNESS_CAP: usize = 10;

/// Weight table for one section kind
#[derive(Debug, Clone)]
pub struct RankingPolicy {
    section: SectionKind,
    weights: &'static [(FactKind, f64)],
}

const OUTLINE_WEIGHTS: &[(FactKind, f64)] = &[
    (FactKind::Architecture, 2.5),
    (FactKind::Module, 2.5),
    (FactKind::Framework, 2.0),
    (FactKind::ApiSummary, 2.0),
    (FactKind::Language, 1.5),
    (FactKind::Model, 1.5),
    (FactKind::Repo, 1.0),
    (FactKind::Endpoint, 1.0),
    (FactKind::FrontendRoute, 1.0),
    (FactKind::Entrypoints, 1.0),
    (FactKind::BuildFiles, 0.5),
    (FactKind::Dependency, 0.3),
];

const THEORY_WEIGHTS: &[(FactKind, f64)] = &[
    (FactKind::Architecture, 3.0),
    (FactKind::Framework, 2.5),
    (FactKind::Language, 1.5),
    (FactKind::Module, 1.5),
    (FactKind::ApiSummary, 1.5),
    (FactKind::Repo, 1.0),
    (FactKind::Model, 1.0),
    (FactKind::Endpoint, 0.8),
    (FactKind::FrontendRoute, 0.8),
    (FactKind::Entrypoints, 0.5),
    (FactKind::BuildFiles, 0.5),
    (FactKind::Dependency, 0.3),
];

const PRACTICE_WEIGHTS: &[(FactKind, f64)] = &[
    (FactKind::Endpoint, 3.0),
    (FactKind::Model, 3.0),
    (FactKind::ApiSummary, 2.5),
    (FactKind::Module, 2.5),
    (FactKind::FrontendRoute, 2.0),
    (FactKind::Framework, 1.5),
    (FactKind::Architecture, 1.5),
    (FactKind::Language, 1.0),
    (FactKind::Entrypoints, 1.0),
    (FactKind::BuildFiles, 0.8),
    (FactKind::Dependency, 0.5),
    (FactKind::Repo, 0.5),
];

const CONCLUSION_WEIGHTS: &[(FactKind, f64)] = &[
    (FactKind::Architecture, 2.5),
    (FactKind::Framework, 2.0),
    (FactKind::Language, 1.5),
    (FactKind::ApiSummary, 1.5),
    (FactKind::Module, 1.5),
    (FactKind::Repo, 1.0),
    (FactKind::Model, 1.0),
    (FactKind::Endpoint, 0.5),
    (FactKind::FrontendRoute, 0.5),
    (FactKind::Entrypoints, 0.5),
    (FactKind::BuildFiles, 0.5),
    (FactKind::Dependency, 0.3),
];

impl RankingPolicy {
    pub fn for_section(section: SectionKind) -> Self {
        let weights = match section {
            SectionKind::Outline => OUTLINE_WEIGHTS,
            SectionKind::Theory => THEORY_WEIGHTS,
            SectionKind::Practice => PRACTICE_WEIGHTS,
            SectionKind::Conclusion => CONCLUSION_WEIGHTS,
        };
        Self { section, weights }
    }

    pub fn section(&self) -> SectionKind {
        self.section
    }

    pub fn weight(&self, kind: FactKind) -> f64 {
        self.weights
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    /// policy weight × evidence richness, richness in [1, 2]
    pub fn score(&self, record: &FactRecord) -> f64 {
        let richness = 1.0 + record.evidence_count.min(RICHNESS_CAP) as f64 / RICHNESS_CAP as f64;
        self.weight(record.kind) * richness
    }

    /// Sort by score descending, then key ascending
    pub fn rank<'a>(&self, records: impl IntoIterator<Item = &'a FactRecord>) -> Vec<&'a FactRecord> {
        let mut scored: Vec<(f64, &FactRecord)> =
            records.into_iter().map(|r| (self.score(r), r)).collect();
        scored.sort_by(|(sa, a), (sb, b)| {
            sb.partial_cmp(sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        scored.into_iter().map(|(_, r)| r).collect()
    }
}
