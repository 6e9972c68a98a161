//! Facts document (`facts.v1`)
//!
//! Evidenced, deterministic description of a repository at one commit.
//! Every fact carries evidence and flattens to a [`FactRecord`] with a stable
//! [`FactKey`] derived from its kind and discriminating fields.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::facts as facts_constants;

// =============================================================================
// Evidence
// =============================================================================

/// Pointer from a fact to the file (and optionally lines) that justify it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Evidence {
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<u32>,
}

impl Evidence {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.lines.push(line);
        self
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lines.as_slice() {
            [] => write!(f, "{}", self.path),
            [line] => write!(f, "{}:{}", self.path, line),
            lines => {
                let joined: Vec<String> = lines.iter().map(u32::to_string).collect();
                write!(f, "{}:{}", self.path, joined.join(","))
            }
        }
    }
}

// =============================================================================
// Fact Keys
// =============================================================================

/// Kind of an individual fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Repo,
    Language,
    Framework,
    Architecture,
    Module,
    ApiSummary,
    Endpoint,
    FrontendRoute,
    Model,
    Dependency,
    BuildFiles,
    Entrypoints,
}

impl FactKind {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Repo => "repo",
            Self::Language => "languages",
            Self::Framework => "frameworks",
            Self::Architecture => "architecture",
            Self::Module => "modules",
            Self::ApiSummary => "api.summary",
            Self::Endpoint => "api.endpoints",
            Self::FrontendRoute => "frontend_routes",
            Self::Model => "models",
            Self::Dependency => "runtime.dependencies",
            Self::BuildFiles => "runtime.build_files",
            Self::Entrypoints => "runtime.entrypoints",
        }
    }

    /// Language and architecture facts are always part of a context pack
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Self::Language | Self::Architecture)
    }
}

/// Stable fact identifier, e.g. `languages.python` or `api.endpoints.GET /users`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactKey(String);

impl FactKey {
    /// Key for a kind with a single fact per document
    pub fn of(kind: FactKind) -> Self {
        Self(kind.prefix().to_string())
    }

    /// Key for a kind discriminated by name
    pub fn named(kind: FactKind, name: &str) -> Self {
        Self(format!("{}.{}", kind.prefix(), name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FactKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FactKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for FactKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Individual Facts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub url: String,
    pub commit: String,
    pub detected_at: DateTime<Utc>,
}

impl RepoInfo {
    pub fn new(url: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            commit: commit.into(),
            detected_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageFact {
    pub name: String,
    /// Share of recognized code lines, rounded to two decimals
    pub ratio: f64,
    pub lines_of_code: u64,
    pub files: u64,
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkFact {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Dependency name that revealed the framework
    pub source: String,
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureFact {
    #[serde(rename = "type")]
    pub arch_type: String,
    pub layers: Vec<String>,
    pub details: BTreeMap<String, String>,
    pub evidence: Vec<Evidence>,
}

impl Default for ArchitectureFact {
    fn default() -> Self {
        Self {
            arch_type: "unknown".to_string(),
            layers: vec!["unknown".to_string()],
            details: BTreeMap::new(),
            evidence: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFact {
    pub name: String,
    pub path: String,
    pub role: String,
    pub files: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submodules: Vec<String>,
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointFact {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    pub framework: String,
    pub evidence: Vec<Evidence>,
}

impl EndpointFact {
    /// Discriminator used in the fact key
    pub fn signature(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFacts {
    pub endpoints: Vec<EndpointFact>,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFact {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default)]
    pub auth_required: bool,
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub orm: String,
    pub fields: Vec<ModelField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<String>,
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyFact {
    pub name: String,
    pub version: String,
    pub ecosystem: String,
    #[serde(default)]
    pub dev: bool,
    pub evidence: Vec<Evidence>,
}

impl DependencyFact {
    pub fn signature(&self) -> String {
        format!("{}:{}", self.ecosystem, self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeFacts {
    pub dependencies: Vec<DependencyFact>,
    pub build_files: Vec<String>,
    pub entrypoints: Vec<String>,
}

/// Marker for a facet whose detector failed
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartialFacet {
    pub facet: String,
    pub reason: String,
}

// =============================================================================
// Facts Document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facts {
    pub schema: String,
    pub repo: RepoInfo,
    pub languages: Vec<LanguageFact>,
    pub frameworks: Vec<FrameworkFact>,
    pub architecture: ArchitectureFact,
    pub modules: Vec<ModuleFact>,
    pub api: ApiFacts,
    pub frontend_routes: Vec<RouteFact>,
    pub models: Vec<ModelFact>,
    pub runtime: RuntimeFacts,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partial: Vec<PartialFacet>,
}

impl Facts {
    /// Empty document for a repository, filled in by the aggregator
    pub fn empty(repo: RepoInfo) -> Self {
        Self {
            schema: facts_constants::SCHEMA.to_string(),
            repo,
            languages: Vec::new(),
            frameworks: Vec::new(),
            architecture: ArchitectureFact::default(),
            modules: Vec::new(),
            api: ApiFacts::default(),
            frontend_routes: Vec::new(),
            models: Vec::new(),
            runtime: RuntimeFacts::default(),
            partial: Vec::new(),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Flatten the document into keyed records.
    ///
    /// Order is fixed by kind, then by the order facts appear in the document.
    /// A key that would repeat is dropped, keeping keys unique.
    pub fn records(&self) -> Vec<FactRecord> {
        let mut records = Vec::new();
        let mut seen = BTreeSet::new();
        let mut push = |record: FactRecord| {
            if seen.insert(record.key.clone()) {
                records.push(record);
            }
        };

        push(FactRecord {
            key: FactKey::of(FactKind::Repo),
            kind: FactKind::Repo,
            text: format!(
                "Repository {} at commit {}",
                self.repo.url,
                short_commit(&self.repo.commit)
            ),
            details: None,
            evidence_count: 0,
        });

        for lang in &self.languages {
            push(FactRecord {
                key: FactKey::named(FactKind::Language, &lang.name),
                kind: FactKind::Language,
                text: format!(
                    "{}: {:.0}% of code ({} lines in {} files)",
                    lang.name,
                    lang.ratio * 100.0,
                    lang.lines_of_code,
                    lang.files
                ),
                details: evidence_details(&lang.evidence),
                evidence_count: lang.evidence.len(),
            });
        }

        for fw in &self.frameworks {
            push(FactRecord {
                key: FactKey::named(FactKind::Framework, &fw.name),
                kind: FactKind::Framework,
                text: format!("{} ({})", fw.name, fw.kind),
                details: Some(format!(
                    "declared as '{}' in {}",
                    fw.source,
                    join_evidence(&fw.evidence)
                )),
                evidence_count: fw.evidence.len(),
            });
        }

        let arch = &self.architecture;
        push(FactRecord {
            key: FactKey::of(FactKind::Architecture),
            kind: FactKind::Architecture,
            text: format!(
                "Architecture: {}; layers: {}",
                arch.arch_type,
                arch.layers.join(", ")
            ),
            details: (!arch.details.is_empty()).then(|| {
                arch.details
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ")
            }),
            evidence_count: arch.evidence.len(),
        });

        for module in &self.modules {
            push(FactRecord {
                key: FactKey::named(FactKind::Module, &module.path),
                kind: FactKind::Module,
                text: format!(
                    "Module {} ({}, {} files)",
                    module.path, module.role, module.files
                ),
                details: (!module.submodules.is_empty())
                    .then(|| format!("submodules: {}", module.submodules.join(", "))),
                evidence_count: module.evidence.len(),
            });
        }

        if !self.api.endpoints.is_empty() {
            let frameworks: BTreeSet<&str> = self
                .api
                .endpoints
                .iter()
                .map(|e| e.framework.as_str())
                .collect();
            push(FactRecord {
                key: FactKey::of(FactKind::ApiSummary),
                kind: FactKind::ApiSummary,
                text: format!(
                    "{} API endpoints ({})",
                    self.api.total_count,
                    frameworks.into_iter().collect::<Vec<_>>().join(", ")
                ),
                details: None,
                evidence_count: self.api.endpoints.len(),
            });
        }

        for endpoint in &self.api.endpoints {
            push(FactRecord {
                key: FactKey::named(FactKind::Endpoint, &endpoint.signature()),
                kind: FactKind::Endpoint,
                text: match &endpoint.handler {
                    Some(handler) => format!("{} -> {}", endpoint.signature(), handler),
                    None => endpoint.signature(),
                },
                details: Some(format!(
                    "{} in {}",
                    endpoint.framework,
                    join_evidence(&endpoint.evidence)
                )),
                evidence_count: endpoint.evidence.len(),
            });
        }

        for route in &self.frontend_routes {
            push(FactRecord {
                key: FactKey::named(FactKind::FrontendRoute, &route.path),
                kind: FactKind::FrontendRoute,
                text: match &route.component {
                    Some(component) => format!("Route {} -> {}", route.path, component),
                    None => format!("Route {}", route.path),
                },
                details: route.name.as_ref().map(|n| format!("name: {}", n)),
                evidence_count: route.evidence.len(),
            });
        }

        for model in &self.models {
            let fields: Vec<String> = model
                .fields
                .iter()
                .map(|f| format!("{}:{}", f.name, f.field_type))
                .collect();
            let mut details = format!("fields: {}", fields.join(", "));
            if !model.relationships.is_empty() {
                details.push_str(&format!("; relationships: {}", model.relationships.join(", ")));
            }
            push(FactRecord {
                key: FactKey::named(FactKind::Model, &model.name),
                kind: FactKind::Model,
                text: match &model.table {
                    Some(table) => format!("Model {} ({}, table {})", model.name, model.orm, table),
                    None => format!("Model {} ({})", model.name, model.orm),
                },
                details: Some(details),
                evidence_count: model.evidence.len(),
            });
        }

        for dep in &self.runtime.dependencies {
            push(FactRecord {
                key: FactKey::named(FactKind::Dependency, &dep.signature()),
                kind: FactKind::Dependency,
                text: format!(
                    "{} dependency {} {}{}",
                    dep.ecosystem,
                    dep.name,
                    dep.version,
                    if dep.dev { " (dev)" } else { "" }
                ),
                details: None,
                evidence_count: dep.evidence.len(),
            });
        }

        if !self.runtime.build_files.is_empty() {
            push(FactRecord {
                key: FactKey::of(FactKind::BuildFiles),
                kind: FactKind::BuildFiles,
                text: format!("Build files: {}", self.runtime.build_files.join(", ")),
                details: None,
                evidence_count: self.runtime.build_files.len(),
            });
        }

        if !self.runtime.entrypoints.is_empty() {
            push(FactRecord {
                key: FactKey::of(FactKind::Entrypoints),
                kind: FactKind::Entrypoints,
                text: format!("Entrypoints: {}", self.runtime.entrypoints.join(", ")),
                details: None,
                evidence_count: self.runtime.entrypoints.len(),
            });
        }

        records
    }

    /// All fact keys in the document
    pub fn keys(&self) -> BTreeSet<FactKey> {
        self.records().into_iter().map(|r| r.key).collect()
    }
}

/// A single flattened fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
    pub key: FactKey,
    pub kind: FactKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub evidence_count: usize,
}

impl FactRecord {
    /// Full rendering used in prompts
    pub fn render(&self) -> String {
        match &self.details {
            Some(details) => format!("- [{}] {}\n  {}", self.key, self.text, details),
            None => self.render_compact(),
        }
    }

    /// Rendering without details, used when the budget is tight
    pub fn render_compact(&self) -> String {
        format!("- [{}] {}", self.key, self.text)
    }
}

fn short_commit(commit: &str) -> &str {
    commit.get(..12).unwrap_or(commit)
}

fn join_evidence(evidence: &[Evidence]) -> String {
    evidence
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn evidence_details(evidence: &[Evidence]) -> Option<String> {
    (!evidence.is_empty()).then(|| format!("e.g. {}", join_evidence(evidence)))
}
