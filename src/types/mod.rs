pub mod error;
pub mod facts;
pub mod section;
pub mod utils;

pub use error::{
    ErrorCategory, ErrorClassifier, FactweaveError, GenerationError, Result, ResultExt,
};
pub use facts::{
    ApiFacts, ArchitectureFact, DependencyFact, EndpointFact, Evidence, FactKey, FactKind,
    FactRecord, Facts, FrameworkFact, LanguageFact, ModelFact, ModelField, ModuleFact,
    PartialFacet, RepoInfo, RouteFact, RuntimeFacts,
};
pub use section::SectionKind;
pub use utils::{log_filter_error, log_filter_warn, round_to, truncate_chars};

// =============================================================================
// Domain Newtypes
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe wrapper for document IDs
///
/// Documents are independent of each other; every artifact is keyed by one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_generate_is_unique() {
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }

    #[test]
    fn test_document_id_display() {
        let id = DocumentId::from("doc-1");
        assert_eq!(id.to_string(), "doc-1");
        assert_eq!(id.as_ref(), "doc-1");
    }
}
