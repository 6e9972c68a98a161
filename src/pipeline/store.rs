//! Artifact and context pack records
//!
//! Records are immutable once written and keyed by
//! (document id, section kind, attempt number). Durable persistence belongs
//! to whoever implements `ArtifactStore`; `MemoryArtifactStore` keeps
//! everything in process.

use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use crate::context::{ContextPack, Synopsis};
use crate::types::{DocumentId, FactKey, FactweaveError, Result, SectionKind};
use crate::validation::PracticeValidation;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub document_id: DocumentId,
    pub section: SectionKind,
    pub attempt: u32,
}

impl RecordKey {
    pub fn new(document_id: DocumentId, section: SectionKind, attempt: u32) -> Self {
        Self {
            document_id,
            section,
            attempt,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.document_id, self.section, self.attempt)
    }
}

/// Generated section text with what is needed to explain and reproduce it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub key: RecordKey,
    pub text: String,
    pub facts_used: Vec<FactKey>,
    pub template_id: String,
    pub template_version: u32,
    /// Fingerprint of the context pack stored under the same key
    pub fingerprint: String,
    pub synopsis: Synopsis,
    /// Present for the practice section only
    pub practice: Option<PracticeValidation>,
    /// Collaborator calls it took
    pub tries: u32,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn section(&self) -> SectionKind {
        self.key.section
    }

    pub fn attempt(&self) -> u32 {
        self.key.attempt
    }
}

pub trait ArtifactStore: Send + Sync {
    /// Insert a new artifact; an existing key is an error
    fn put(&self, artifact: Artifact) -> Result<()>;

    fn get(&self, key: &RecordKey) -> Result<Option<Artifact>>;

    /// Highest attempt stored for a section
    fn latest(&self, document_id: &DocumentId, section: SectionKind) -> Result<Option<Artifact>>;

    /// All artifacts of a document ordered by (section, attempt)
    fn list(&self, document_id: &DocumentId) -> Result<Vec<Artifact>>;

    fn put_pack(&self, pack: ContextPack) -> Result<()>;

    fn get_pack(&self, key: &RecordKey) -> Result<Option<ContextPack>>;

    /// Highest attempt holding any record of a section, artifact or pack; 0 when none
    fn latest_attempt(&self, document_id: &DocumentId, section: SectionKind) -> Result<u32>;
}

#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: DashMap<RecordKey, Artifact>,
    packs: DashMap<RecordKey, ContextPack>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_once<V>(map: &DashMap<RecordKey, V>, key: RecordKey, value: V, what: &str) -> Result<()> {
    match map.entry(key) {
        Entry::Occupied(entry) => Err(FactweaveError::Context(format!(
            "{} already stored for {}",
            what,
            entry.key()
        ))),
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn put(&self, artifact: Artifact) -> Result<()> {
        insert_once(&self.artifacts, artifact.key.clone(), artifact, "Artifact")
    }

    fn get(&self, key: &RecordKey) -> Result<Option<Artifact>> {
        Ok(self.artifacts.get(key).map(|a| a.value().clone()))
    }

    fn latest(&self, document_id: &DocumentId, section: SectionKind) -> Result<Option<Artifact>> {
        Ok(self
            .artifacts
            .iter()
            .filter(|e| &e.key().document_id == document_id && e.key().section == section)
            .max_by_key(|e| e.key().attempt)
            .map(|e| e.value().clone()))
    }

    fn list(&self, document_id: &DocumentId) -> Result<Vec<Artifact>> {
        let mut artifacts: Vec<Artifact> = self
            .artifacts
            .iter()
            .filter(|e| &e.key().document_id == document_id)
            .map(|e| e.value().clone())
            .collect();
        artifacts.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(artifacts)
    }

    fn put_pack(&self, pack: ContextPack) -> Result<()> {
        let key = RecordKey::new(pack.document_id.clone(), pack.section, pack.attempt);
        insert_once(&self.packs, key, pack, "Context pack")
    }

    fn get_pack(&self, key: &RecordKey) -> Result<Option<ContextPack>> {
        Ok(self.packs.get(key).map(|p| p.value().clone()))
    }

    fn latest_attempt(&self, document_id: &DocumentId, section: SectionKind) -> Result<u32> {
        let matches = |key: &RecordKey| &key.document_id == document_id && key.section == section;
        let artifacts = self
            .artifacts
            .iter()
            .filter(|e| matches(e.key()))
            .map(|e| e.key().attempt);
        let packs = self
            .packs
            .iter()
            .filter(|e| matches(e.key()))
            .map(|e| e.key().attempt);
        Ok(artifacts.chain(packs).max().unwrap_or(0))
    }
}
