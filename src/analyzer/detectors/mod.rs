//! Detector Set
//!
//! One detector per concern, all behind the [`FactDetector`] capability.
//! The set is closed: [`Detector`] enumerates every variant and dispatches
//! explicitly, and [`Detector::stage`] fixes the order the aggregator
//! runs them in.
//!
//! ```text
//! stage 0: languages, runtime            (no prerequisites)
//! stage 1: frameworks, modules           (frameworks read runtime dependencies)
//! stage 2: architecture, api, routes, models
//! ```

mod api;
mod architecture;
mod frameworks;
mod languages;
mod models;
mod modules;
mod routes;
mod runtime;

pub use api::ApiDetector;
pub use architecture::ArchitectureDetector;
pub use frameworks::FrameworkDetector;
pub use languages::LanguageDetector;
pub use models::ModelDetector;
pub use modules::ModuleDetector;
pub use routes::FrontendRouteDetector;
pub use runtime::RuntimeDetector;

use std::collections::BTreeSet;
use std::fmt;

use super::source_tree::SourceTree;
use crate::types::{
    ApiFacts, ArchitectureFact, Facts, FrameworkFact, LanguageFact, ModelFact, ModuleFact,
    Result, RouteFact, RuntimeFacts,
};

// =============================================================================
// Detector Contract
// =============================================================================

/// Everything a detector may look at
pub struct DetectorInput<'a> {
    pub tree: &'a dyn SourceTree,
    /// Sorted file list, computed once per analysis
    pub files: &'a [String],
    /// Facts aggregated by earlier stages
    pub facts: &'a Facts,
}

impl<'a> DetectorInput<'a> {
    /// Files whose extension is one of `extensions` (lowercase, no dot)
    pub fn files_with_extension<'s>(
        &'s self,
        extensions: &'s [&'s str],
    ) -> impl Iterator<Item = &'a String> + 's {
        self.files.iter().filter(move |path| {
            extension(path).is_some_and(|ext| extensions.contains(&ext.as_str()))
        })
    }

    /// Files whose base name satisfies `predicate`
    pub fn files_named<'s, F>(&'s self, predicate: F) -> impl Iterator<Item = &'a String> + 's
    where
        F: Fn(&str) -> bool + 's,
    {
        self.files
            .iter()
            .filter(move |path| predicate(file_name(path)))
    }

    /// Distinct top-level directory names, sorted
    pub fn top_level_dirs(&self) -> Vec<&'a str> {
        let dirs: BTreeSet<&str> = self
            .files
            .iter()
            .filter_map(|path| path.split_once('/').map(|(dir, _)| dir))
            .collect();
        dirs.into_iter().collect()
    }
}

/// Output of one detector, merged into the facts document by the aggregator
#[derive(Debug, Clone)]
pub enum Facet {
    Languages(Vec<LanguageFact>),
    Runtime(RuntimeFacts),
    Frameworks(Vec<FrameworkFact>),
    Modules(Vec<ModuleFact>),
    Architecture(ArchitectureFact),
    Api(ApiFacts),
    FrontendRoutes(Vec<RouteFact>),
    Models(Vec<ModelFact>),
}

impl Facet {
    pub fn apply(self, facts: &mut Facts) {
        match self {
            Facet::Languages(v) => facts.languages = v,
            Facet::Runtime(v) => facts.runtime = v,
            Facet::Frameworks(v) => facts.frameworks = v,
            Facet::Modules(v) => facts.modules = v,
            Facet::Architecture(v) => facts.architecture = v,
            Facet::Api(v) => facts.api = v,
            Facet::FrontendRoutes(v) => facts.frontend_routes = v,
            Facet::Models(v) => facts.models = v,
        }
    }
}

/// Shared capability of every detector
pub trait FactDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Facet>;
}

// =============================================================================
// Detector Registry
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Detector {
    Languages,
    Runtime,
    Frameworks,
    Modules,
    Architecture,
    Api,
    FrontendRoutes,
    Models,
}

impl Detector {
    pub const ALL: [Detector; 8] = [
        Detector::Languages,
        Detector::Runtime,
        Detector::Frameworks,
        Detector::Modules,
        Detector::Architecture,
        Detector::Api,
        Detector::FrontendRoutes,
        Detector::Models,
    ];

    /// Execution stage; detectors in one stage share no data dependency
    pub fn stage(&self) -> usize {
        match self {
            Detector::Languages | Detector::Runtime => 0,
            Detector::Frameworks | Detector::Modules => 1,
            Detector::Architecture
            | Detector::Api
            | Detector::FrontendRoutes
            | Detector::Models => 2,
        }
    }

    /// Detectors grouped by stage, in execution order
    pub fn stages() -> Vec<Vec<Detector>> {
        let last = Self::ALL.iter().map(|d| d.stage()).max().unwrap_or(0);
        (0..=last)
            .map(|stage| {
                Self::ALL
                    .iter()
                    .copied()
                    .filter(|d| d.stage() == stage)
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FactDetector for Detector {
    fn name(&self) -> &'static str {
        match self {
            Detector::Languages => "languages",
            Detector::Runtime => "runtime",
            Detector::Frameworks => "frameworks",
            Detector::Modules => "modules",
            Detector::Architecture => "architecture",
            Detector::Api => "api",
            Detector::FrontendRoutes => "frontend_routes",
            Detector::Models => "models",
        }
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Facet> {
        match self {
            Detector::Languages => LanguageDetector.detect(input),
            Detector::Runtime => RuntimeDetector::new()?.detect(input),
            Detector::Frameworks => FrameworkDetector.detect(input),
            Detector::Modules => ModuleDetector.detect(input),
            Detector::Architecture => ArchitectureDetector.detect(input),
            Detector::Api => ApiDetector::new()?.detect(input),
            Detector::FrontendRoutes => FrontendRouteDetector::new()?.detect(input),
            Detector::Models => ModelDetector::new()?.detect(input),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Base name of a `/`-separated path
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Lowercase extension without the dot
pub(crate) fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    name.rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext.to_lowercase())
}

/// 1-based line number of a byte offset
pub(crate) fn line_at(content: &str, offset: usize) -> u32 {
    let offset = offset.min(content.len());
    content.as_bytes()[..offset]
        .iter()
        .filter(|b| **b == b'\n')
        .count() as u32
        + 1
}

/// 1-based line of the first line containing `needle`
pub(crate) fn line_of(content: &str, needle: &str) -> Option<u32> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|idx| idx as u32 + 1)
}
