//! Fact Aggregator
//!
//! Runs the detector set stage by stage. Detectors inside one stage run
//! concurrently on the blocking pool against a frozen snapshot of the facts
//! gathered so far; their facets are merged back in the fixed registry
//! order so the resulting document is byte-identical across runs.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::detectors::{Detector, DetectorInput, FactDetector};
use super::source_tree::SourceTree;
use crate::types::{FactweaveError, Facts, PartialFacet, RepoInfo, Result};

pub struct FactAggregator {
    tree: Arc<dyn SourceTree>,
}

impl FactAggregator {
    pub fn new(tree: Arc<dyn SourceTree>) -> Self {
        Self { tree }
    }

    /// Build the facts document for one repository snapshot.
    ///
    /// Fails only when the tree itself cannot be enumerated; a failing
    /// detector leaves its facet at the default value and is recorded in
    /// `partial`.
    #[instrument(skip(self), fields(location = %self.tree.location()))]
    pub async fn analyze(&self, repo: RepoInfo) -> Result<Facts> {
        let tree = Arc::clone(&self.tree);
        let listed = tokio::task::spawn_blocking(move || tree.files())
            .await
            .map_err(|e| FactweaveError::source_unreadable(self.tree.location(), e))?;
        let files = Arc::new(listed.map_err(|e| match e {
            FactweaveError::SourceUnreadable { .. } => e,
            other => FactweaveError::source_unreadable(self.tree.location(), other),
        })?);

        info!(files = files.len(), "Analyzing source tree");

        let mut facts = Facts::empty(repo);

        for (stage, detectors) in Detector::stages().into_iter().enumerate() {
            let snapshot = Arc::new(facts.clone());
            let runs = detectors.iter().map(|&detector| {
                let tree = Arc::clone(&self.tree);
                let files = Arc::clone(&files);
                let snapshot = Arc::clone(&snapshot);
                async move {
                    let joined = tokio::task::spawn_blocking(move || {
                        let input = DetectorInput {
                            tree: tree.as_ref(),
                            files: files.as_slice(),
                            facts: snapshot.as_ref(),
                        };
                        detector.detect(&input)
                    })
                    .await;
                    let outcome = match joined {
                        Ok(result) => result,
                        Err(e) => Err(FactweaveError::detector(detector.name(), e.to_string())),
                    };
                    (detector, outcome)
                }
            });

            // join_all keeps input order, which is registry order
            let outcomes = futures::future::join_all(runs).await;
            debug!(stage, detectors = outcomes.len(), "Detector stage finished");

            for (detector, outcome) in outcomes {
                match outcome {
                    Ok(facet) => facet.apply(&mut facts),
                    Err(e) => {
                        warn!(facet = detector.name(), error = %e, "Detector failed");
                        facts.partial.push(PartialFacet {
                            facet: detector.name().to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        facts.partial.sort_by(|a, b| a.facet.cmp(&b.facet));

        info!(
            languages = facts.languages.len(),
            frameworks = facts.frameworks.len(),
            endpoints = facts.api.total_count,
            partial = facts.partial.len(),
            "Analysis complete"
        );
        Ok(facts)
    }
}
