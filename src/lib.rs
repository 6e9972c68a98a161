//! Factweave - Fact-Grounded Repository Documentation
//!
//! Detects verifiable facts about a source repository and generates a
//! structured document from them, one section at a time, with every step
//! reproducible from its inputs.
//!
//! ## Core Features
//!
//! - **Fact Detection**: languages, frameworks, architecture, modules, API
//!   endpoints, frontend routes, data models and runtime setup as `facts.v1`
//! - **Context Packs**: budgeted, ranked, fingerprinted prompt material per section
//! - **Section Pipeline**: outline → theory → practice → conclusion with
//!   retries, timeouts and isolated regeneration
//! - **Grounded Editing**: edits must cite the facts they rely on
//! - **Validation**: practice content scoring and document quality reports
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use factweave::{Config, FactAggregator, FsSourceTree, MemoryArtifactStore, Orchestrator};
//! use factweave::pipeline::CommandCollaborator;
//! use factweave::types::{DocumentId, RepoInfo};
//!
//! let config = Config::default();
//! let tree = FsSourceTree::with_config("./repo", &config.analysis)?;
//! let facts = FactAggregator::new(Arc::new(tree))
//!     .analyze(RepoInfo::new("https://example.com/repo.git", "HEAD"))
//!     .await?;
//!
//! let collaborator = CommandCollaborator::new("my-generator", vec![]);
//! let orchestrator = Orchestrator::new(
//!     Arc::new(collaborator),
//!     Arc::new(MemoryArtifactStore::new()),
//!     &config,
//! )?;
//! let report = orchestrator.run_full(&DocumentId::from("repo"), &facts).await?;
//! ```
//!
//! ## Modules
//!
//! - [`analyzer`]: source tree access, detectors and the fact aggregator
//! - [`context`]: budgets, ranking, synopses and context packs
//! - [`pipeline`]: section orchestration, collaborator calls, artifacts, editing
//! - [`validation`]: grounding, practice checks, terminology and quality
//! - [`config`]: layered configuration

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod pipeline;
pub mod types;
pub mod validation;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, ContextProfile};

// Error Types
pub use types::error::{ErrorCategory, FactweaveError, Result, ResultExt};

// =============================================================================
// Analysis Re-exports
// =============================================================================

pub use analyzer::{FactAggregator, FsSourceTree, MemorySourceTree, SourceTree};
pub use types::{Facts, SectionKind};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use context::{ContextPack, ContextPackBuilder};
pub use pipeline::{
    ArtifactStore, GenerationCollaborator, GroundedEditor, MemoryArtifactStore, Orchestrator,
    RunReport,
};
pub use validation::{PracticeRules, QualityReporter};
