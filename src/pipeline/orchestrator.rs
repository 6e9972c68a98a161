//! Document Pipeline Orchestrator
//!
//! Drives the sections of a document through the fixed dependency graph:
//!
//! ```text
//! for section in outline, theory, practice, conclusion:
//!     dependencies ready? ── no ──► stays pending (blocked)
//!         │ yes
//!         ▼
//!     context pack ──► collaborator (time boxed, retried) ──► artifact ──► generated
//!                                                                   └─► practice check ──► validated
//! ```
//!
//! Each document keeps its own state, so documents can run concurrently on a
//! shared orchestrator. Regeneration touches exactly one section; sections
//! downstream of it are flagged stale and otherwise left alone.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::collaborator::{GeneratedText, GenerationCollaborator, GenerationRequest};
use super::editor::{EditOutcome, GroundedEditor};
use super::retry::{RetryPolicy, retry_with_backoff};
use super::state::{DocumentState, SectionState};
use super::store::{Artifact, ArtifactStore, RecordKey};
use crate::config::Config;
use crate::context::{ContextPackBuilder, OutlineExcerpt, PackRequest, PromptTemplate, Synopsis};
use crate::types::{DocumentId, FactKey, FactweaveError, Facts, Result, SectionKind};
use crate::validation::PracticeRules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFailure {
    pub section: SectionKind,
    pub error: String,
}

/// Outcome of a full run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub document_id: DocumentId,
    pub generated: Vec<SectionKind>,
    pub failed: Vec<SectionFailure>,
    /// Left pending because a dependency is not ready
    pub blocked: Vec<SectionKind>,
    pub stale: Vec<SectionKind>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.blocked.is_empty()
    }
}

pub struct Orchestrator {
    collaborator: Arc<dyn GenerationCollaborator>,
    store: Arc<dyn ArtifactStore>,
    builder: ContextPackBuilder,
    practice: PracticeRules,
    retry: RetryPolicy,
    outline_excerpt: OutlineExcerpt,
    synopsis_max_chars: usize,
    documents: DashMap<DocumentId, DocumentState>,
}

impl Orchestrator {
    pub fn new(
        collaborator: Arc<dyn GenerationCollaborator>,
        store: Arc<dyn ArtifactStore>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            collaborator,
            store,
            builder: ContextPackBuilder::new(config.context.budget())
                .with_synopsis_max_chars(config.context.synopsis_max_chars),
            practice: PracticeRules::from_config(&config.practice)?,
            retry: RetryPolicy::from_config(&config.pipeline),
            outline_excerpt: config.context.outline_excerpt,
            synopsis_max_chars: config.context.synopsis_max_chars,
            documents: DashMap::new(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Snapshot of a document's section states
    pub fn document_state(&self, document_id: &DocumentId) -> DocumentState {
        self.documents
            .get(document_id)
            .map(|d| d.value().clone())
            .unwrap_or_default()
    }

    fn update<R>(&self, document_id: &DocumentId, f: impl FnOnce(&mut DocumentState) -> R) -> R {
        let mut entry = self.documents.entry(document_id.clone()).or_default();
        f(entry.value_mut())
    }

    fn transition(&self, document_id: &DocumentId, section: SectionKind, next: SectionState) {
        let applied = self.update(document_id, |doc| doc.transition(section, next));
        if !applied {
            debug!(section = %section, next = %next, "Ignored state transition");
        }
    }

    // =========================================================================
    // Full generation
    // =========================================================================

    /// Generate every section in dependency order.
    ///
    /// A failed section does not stop the run; sections that depend on it
    /// stay pending and are reported as blocked. A budget that cannot hold the
    /// mandatory facts aborts the run.
    #[instrument(skip_all, fields(document = %document_id))]
    pub async fn run_full(&self, document_id: &DocumentId, facts: &Facts) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport {
            document_id: document_id.clone(),
            generated: Vec::new(),
            failed: Vec::new(),
            blocked: Vec::new(),
            stale: Vec::new(),
            duration_ms: 0,
        };

        for section in SectionKind::ALL {
            let missing = self.update(document_id, |doc| doc.missing_dependencies(section));
            if !missing.is_empty() {
                info!(section = %section, ?missing, "Section blocked");
                report.blocked.push(section);
                continue;
            }

            match self.generate_section(document_id, section, facts).await {
                Ok(_) => report.generated.push(section),
                Err(err @ FactweaveError::BudgetTooSmall { .. }) => return Err(err),
                Err(err) => report.failed.push(SectionFailure {
                    section,
                    error: err.to_string(),
                }),
            }
        }

        report.stale = self.document_state(document_id).stale_sections();
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            generated = report.generated.len(),
            failed = report.failed.len(),
            blocked = report.blocked.len(),
            duration_ms = report.duration_ms,
            "Document run finished"
        );
        Ok(report)
    }

    // =========================================================================
    // Isolated regeneration
    // =========================================================================

    /// Regenerate one section. Downstream artifacts are not touched; those
    /// sections that already have one are flagged stale.
    #[instrument(skip_all, fields(document = %document_id, section = %section))]
    pub async fn regenerate(
        &self,
        document_id: &DocumentId,
        section: SectionKind,
        facts: &Facts,
    ) -> Result<Artifact> {
        let missing = self.update(document_id, |doc| doc.missing_dependencies(section));
        if !missing.is_empty() {
            return Err(FactweaveError::Blocked {
                section: section.to_string(),
                missing: missing
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let artifact = self.generate_section(document_id, section, facts).await?;

        let flagged = self.update(document_id, |doc| {
            section
                .downstream()
                .into_iter()
                .filter(|down| {
                    let status = doc.status_mut(*down);
                    if status.attempt > 0 {
                        status.stale = true;
                    }
                    status.stale
                })
                .collect::<Vec<_>>()
        });
        if !flagged.is_empty() {
            info!(?flagged, "Downstream sections flagged stale");
        }
        Ok(artifact)
    }

    // =========================================================================
    // One section
    // =========================================================================

    fn synopses(&self, document_id: &DocumentId, section: SectionKind) -> Result<Vec<Synopsis>> {
        let mut synopses = Vec::new();
        for dep in section.dependencies() {
            let Some(artifact) = self.store.latest(document_id, *dep)? else {
                continue;
            };
            let synopsis = match (dep, self.outline_excerpt) {
                (SectionKind::Outline, OutlineExcerpt::HeadingsOnly) => Synopsis::excerpt(
                    *dep,
                    &artifact.text,
                    self.outline_excerpt,
                    self.synopsis_max_chars,
                ),
                _ => artifact.synopsis,
            };
            synopses.push(synopsis);
        }
        Ok(synopses)
    }

    async fn generate_section(
        &self,
        document_id: &DocumentId,
        section: SectionKind,
        facts: &Facts,
    ) -> Result<Artifact> {
        let attempt = self.store.latest_attempt(document_id, section)? + 1;

        let synopses = self.synopses(document_id, section)?;
        let pack = self.builder.build(PackRequest {
            document_id,
            section,
            attempt,
            facts,
            synopses: &synopses,
        })?;

        let template = PromptTemplate::for_section(section);
        let request = GenerationRequest {
            system_prompt: pack.system_prompt.clone(),
            user_prompt: pack.user_prompt.clone(),
            schema: template.output_schema(),
        };

        self.transition(document_id, section, SectionState::Generating);
        debug!(section = %section, attempt, tokens = pack.estimated_tokens, "Generating section");

        let collaborator = &self.collaborator;
        let request = &request;
        let generated = retry_with_backoff(
            &self.retry,
            &format!("generate {}", section),
            collaborator.name(),
            move || async move {
                let value = collaborator.generate(request).await?;
                GeneratedText::from_value(value)
            },
        )
        .await;

        let generated = match generated {
            Ok(generated) => generated,
            Err(err) => {
                warn!(section = %section, error = %err, "Section failed");
                self.transition(document_id, section, SectionState::Failed);
                self.update(document_id, |doc| {
                    doc.status_mut(section).last_error = Some(err.to_string());
                });
                return Err(err);
            }
        };

        let offered: BTreeSet<&FactKey> = pack.selected_keys.iter().collect();
        let unknown = generated
            .value
            .facts_used
            .iter()
            .filter(|k| !offered.contains(k))
            .count();
        if unknown > 0 {
            warn!(section = %section, unknown, "Section cites facts outside its pack");
        }

        let practice = (section == SectionKind::Practice)
            .then(|| self.practice.validate(&generated.value.text));
        if let Some(validation) = &practice
            && !validation.valid
        {
            warn!(
                score = validation.score,
                warnings = ?validation.warnings,
                "Practice section below requirements"
            );
        }

        let key = RecordKey::new(document_id.clone(), section, attempt);
        let artifact = Artifact {
            key,
            synopsis: Synopsis::from_text(section, &generated.value.text, self.synopsis_max_chars),
            text: generated.value.text,
            facts_used: generated.value.facts_used,
            template_id: pack.template_id.clone(),
            template_version: pack.template_version,
            fingerprint: pack.fingerprint.clone(),
            practice,
            tries: generated.tries,
            created_at: Utc::now(),
        };

        // Artifact first: a failed write leaves nothing behind under this attempt
        if let Err(err) = self
            .store
            .put(artifact.clone())
            .and_then(|_| self.store.put_pack(pack))
        {
            warn!(section = %section, attempt, error = %err, "Storing section failed");
            self.transition(document_id, section, SectionState::Failed);
            self.update(document_id, |doc| {
                doc.status_mut(section).last_error = Some(err.to_string());
            });
            return Err(err);
        }

        let validated = artifact.practice.as_ref().is_some_and(|p| p.valid);
        self.update(document_id, |doc| {
            doc.transition(section, SectionState::Generated);
            if validated {
                doc.transition(section, SectionState::Validated);
            }
            let status = doc.status_mut(section);
            status.attempt = attempt;
            status.stale = false;
            status.last_error = None;
        });

        info!(section = %section, attempt, tries = artifact.tries, "Section generated");
        Ok(artifact)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Edit the latest artifact of a section.
    ///
    /// Returns the accepted edit without storing it; a grounding rejection is
    /// returned as `FactweaveError::Grounding`.
    #[instrument(skip_all, fields(document = %document_id, section = %section))]
    pub async fn edit(
        &self,
        document_id: &DocumentId,
        section: SectionKind,
        editor: &GroundedEditor,
    ) -> Result<EditOutcome> {
        let artifact = self.store.latest(document_id, section)?.ok_or_else(|| {
            FactweaveError::NotFound(format!("artifact for {}/{}", document_id, section))
        })?;
        let pack = self.store.get_pack(&artifact.key)?.ok_or_else(|| {
            FactweaveError::NotFound(format!("context pack for {}", artifact.key))
        })?;

        let (text, replacements) = editor.prepare(&artifact.text);
        let request = editor.request(&text, &pack);
        let offered: BTreeSet<FactKey> = pack.selected_keys.iter().cloned().collect();

        let collaborator = &self.collaborator;
        let request = &request;
        let value = retry_with_backoff(
            &self.retry,
            &format!("edit {}", section),
            collaborator.name(),
            move || collaborator.generate(request),
        )
        .await?
        .value;

        let output = editor.review(value, &offered)?;
        info!(
            level = %editor.level(),
            changes = output.changes_made.len(),
            replacements = replacements.len(),
            "Edit accepted"
        );
        Ok(EditOutcome {
            output,
            replacements,
            level: editor.level(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::context::ContextPack;
    use crate::pipeline::MemoryArtifactStore;
    use crate::types::{
        ArchitectureFact, ErrorCategory, Evidence, FrameworkFact, GenerationError, LanguageFact,
        RepoInfo,
    };
    use crate::validation::EnforcementLevel;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const PRACTICE_TEXT: &str = "\
The OrderService calls the PaymentGateway and the InventoryLedger.

## Algorithm
Input: cart
1. validate
2. charge
Output: order

| Step | Owner |
|------|-------|
| charge | PaymentGateway |
";

    /// Answers per section; fails sections listed in `fail_on`
    struct MockCollaborator {
        calls: AtomicU32,
        fail_on: Vec<SectionKind>,
        delay: Option<Duration>,
        answer: Option<Value>,
    }

    impl MockCollaborator {
        fn ok() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_on: Vec::new(),
                delay: None,
                answer: None,
            }
        }

        fn failing(sections: &[SectionKind]) -> Self {
            Self {
                fail_on: sections.to_vec(),
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl GenerationCollaborator for MockCollaborator {
        async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(answer) = &self.answer {
                return Ok(answer.clone());
            }
            let section = SectionKind::ALL
                .into_iter()
                .find(|s| request.user_prompt.contains(&format!("# Section\n{}\n", s)))
                .unwrap_or(SectionKind::Outline);
            if self.fail_on.contains(&section) {
                return Err(GenerationError::new(ErrorCategory::Provider, "503 overloaded").into());
            }
            let text = match section {
                SectionKind::Practice => PRACTICE_TEXT.to_string(),
                other => format!("# {}\n\n- point one of call {}\n- point two\n- point three\n", other, call),
            };
            Ok(json!({ "text": text, "facts_used": ["architecture"] }))
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn facts() -> Facts {
        let mut facts = Facts::empty(RepoInfo::new("https://example.com/shop.git", "abc123"));
        facts.languages = vec![LanguageFact {
            name: "python".to_string(),
            ratio: 1.0,
            lines_of_code: 900,
            files: 12,
            evidence: vec![Evidence::file("manage.py")],
        }];
        facts.frameworks = vec![FrameworkFact {
            name: "django".to_string(),
            kind: "backend".to_string(),
            source: "pypi:django".to_string(),
            evidence: vec![Evidence::file("requirements.txt").with_line(1)],
        }];
        facts.architecture = ArchitectureFact {
            arch_type: "monolith".to_string(),
            layers: vec!["backend".to_string()],
            details: Default::default(),
            evidence: vec![Evidence::file("manage.py")],
        };
        facts
    }

    fn config() -> Config {
        Config {
            pipeline: PipelineConfig {
                max_attempts: 2,
                base_delay_ms: 1,
                max_delay_secs: 1,
                timeout_secs: 5,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Memory store whose next `failures` artifact writes fail
    struct FlakyStore {
        inner: MemoryArtifactStore,
        failures: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryArtifactStore::new(),
                failures: AtomicU32::new(failures),
            }
        }
    }

    impl ArtifactStore for FlakyStore {
        fn put(&self, artifact: Artifact) -> Result<()> {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(FactweaveError::Context("disk full".to_string()));
            }
            self.inner.put(artifact)
        }

        fn get(&self, key: &RecordKey) -> Result<Option<Artifact>> {
            self.inner.get(key)
        }

        fn latest(&self, document_id: &DocumentId, section: SectionKind) -> Result<Option<Artifact>> {
            self.inner.latest(document_id, section)
        }

        fn list(&self, document_id: &DocumentId) -> Result<Vec<Artifact>> {
            self.inner.list(document_id)
        }

        fn put_pack(&self, pack: ContextPack) -> Result<()> {
            self.inner.put_pack(pack)
        }

        fn get_pack(&self, key: &RecordKey) -> Result<Option<ContextPack>> {
            self.inner.get_pack(key)
        }

        fn latest_attempt(&self, document_id: &DocumentId, section: SectionKind) -> Result<u32> {
            self.inner.latest_attempt(document_id, section)
        }
    }

    fn orchestrator(collaborator: MockCollaborator) -> (Orchestrator, Arc<MockCollaborator>) {
        let collaborator = Arc::new(collaborator);
        let orchestrator = Orchestrator::new(
            collaborator.clone(),
            Arc::new(MemoryArtifactStore::new()),
            &config(),
        )
        .unwrap();
        (orchestrator, collaborator)
    }

    #[tokio::test]
    async fn test_full_run_generates_all_sections() {
        let (orchestrator, collaborator) = orchestrator(MockCollaborator::ok());
        let doc = DocumentId::from("doc");
        let report = orchestrator.run_full(&doc, &facts()).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.generated, SectionKind::ALL.to_vec());
        assert_eq!(collaborator.calls.load(Ordering::SeqCst), 4);

        let state = orchestrator.document_state(&doc);
        assert_eq!(state.state(SectionKind::Outline), SectionState::Generated);
        assert_eq!(state.state(SectionKind::Practice), SectionState::Validated);

        let practice = orchestrator
            .store()
            .latest(&doc, SectionKind::Practice)
            .unwrap()
            .unwrap();
        let validation = practice.practice.unwrap();
        assert_eq!(validation.score, 1.0);
        assert!(validation.valid);

        let key = RecordKey::new(doc, SectionKind::Theory, 1);
        let pack = orchestrator.store().get_pack(&key).unwrap().unwrap();
        assert!(pack.user_prompt.contains("### outline"));
        assert!(pack.verify_fingerprint().unwrap());
    }

    #[tokio::test]
    async fn test_failure_is_isolated_and_blocks_dependents() {
        let (orchestrator, collaborator) =
            orchestrator(MockCollaborator::failing(&[SectionKind::Theory]));
        let doc = DocumentId::from("doc");
        let report = orchestrator.run_full(&doc, &facts()).await.unwrap();

        assert_eq!(report.generated, vec![SectionKind::Outline]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].section, SectionKind::Theory);
        assert_eq!(report.blocked, vec![SectionKind::Practice, SectionKind::Conclusion]);
        // outline once, theory twice (max_attempts = 2)
        assert_eq!(collaborator.calls.load(Ordering::SeqCst), 3);

        let state = orchestrator.document_state(&doc);
        assert_eq!(state.state(SectionKind::Theory), SectionState::Failed);
        assert_eq!(state.state(SectionKind::Practice), SectionState::Pending);
        assert!(state.status(SectionKind::Theory).last_error.is_some());
    }

    #[tokio::test]
    async fn test_regenerate_theory_is_isolated() {
        let (orchestrator, _) = orchestrator(MockCollaborator::ok());
        let doc = DocumentId::from("doc");
        let facts = facts();
        orchestrator.run_full(&doc, &facts).await.unwrap();

        let snapshot = |section| {
            serde_json::to_vec(
                &orchestrator
                    .store()
                    .latest(&doc, section)
                    .unwrap()
                    .unwrap(),
            )
            .unwrap()
        };
        let outline = snapshot(SectionKind::Outline);
        let practice = snapshot(SectionKind::Practice);
        let conclusion = snapshot(SectionKind::Conclusion);

        let artifact = orchestrator
            .regenerate(&doc, SectionKind::Theory, &facts)
            .await
            .unwrap();
        assert_eq!(artifact.attempt(), 2);

        assert_eq!(snapshot(SectionKind::Outline), outline);
        assert_eq!(snapshot(SectionKind::Practice), practice);
        assert_eq!(snapshot(SectionKind::Conclusion), conclusion);

        let state = orchestrator.document_state(&doc);
        assert_eq!(
            state.stale_sections(),
            vec![SectionKind::Practice, SectionKind::Conclusion]
        );
        assert!(!state.status(SectionKind::Theory).stale);
        assert_eq!(orchestrator.store().list(&doc).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_failed_artifact_write_can_be_retried() {
        let store = Arc::new(FlakyStore::new(1));
        let orchestrator =
            Orchestrator::new(Arc::new(MockCollaborator::ok()), store.clone(), &config()).unwrap();
        let doc = DocumentId::from("doc");
        let facts = facts();

        let err = orchestrator
            .regenerate(&doc, SectionKind::Outline, &facts)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disk full"));
        let state = orchestrator.document_state(&doc);
        assert_eq!(state.state(SectionKind::Outline), SectionState::Failed);
        assert!(state.status(SectionKind::Outline).last_error.is_some());
        assert_eq!(store.latest_attempt(&doc, SectionKind::Outline).unwrap(), 0);

        let artifact = orchestrator
            .regenerate(&doc, SectionKind::Outline, &facts)
            .await
            .unwrap();
        assert_eq!(artifact.attempt(), 1);
        assert!(store.get_pack(&artifact.key).unwrap().is_some());
        assert_eq!(
            orchestrator.document_state(&doc).state(SectionKind::Outline),
            SectionState::Generated
        );
    }

    #[tokio::test]
    async fn test_orphan_pack_moves_attempt_forward() {
        let (first, _) = orchestrator(MockCollaborator::ok());
        let doc = DocumentId::from("doc");
        let facts = facts();
        let artifact = first.regenerate(&doc, SectionKind::Outline, &facts).await.unwrap();
        let pack = first.store().get_pack(&artifact.key).unwrap().unwrap();

        // A pack from an interrupted run with no artifact next to it
        let store = Arc::new(MemoryArtifactStore::new());
        store.put_pack(pack).unwrap();
        let second =
            Orchestrator::new(Arc::new(MockCollaborator::ok()), store.clone(), &config()).unwrap();

        let artifact = second.regenerate(&doc, SectionKind::Outline, &facts).await.unwrap();
        assert_eq!(artifact.attempt(), 2);
        assert!(store.get_pack(&artifact.key).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_regenerate_blocked_section() {
        let (orchestrator, collaborator) = orchestrator(MockCollaborator::ok());
        let err = orchestrator
            .regenerate(&DocumentId::from("doc"), SectionKind::Practice, &facts())
            .await
            .unwrap_err();
        match err {
            FactweaveError::Blocked { section, missing } => {
                assert_eq!(section, "practice");
                assert_eq!(missing, "outline, theory");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(collaborator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_marks_section_failed() {
        let collaborator = MockCollaborator {
            delay: Some(Duration::from_secs(10)),
            ..MockCollaborator::ok()
        };
        let (orchestrator, _) = orchestrator(collaborator);
        let orchestrator = orchestrator.with_retry_policy(RetryPolicy {
            max_attempts: 1,
            timeout: Duration::from_millis(20),
            ..RetryPolicy::default()
        });
        let doc = DocumentId::from("doc");
        let report = orchestrator.run_full(&doc, &facts()).await.unwrap();

        assert_eq!(report.failed[0].section, SectionKind::Outline);
        assert!(report.failed[0].error.contains("Timeout"));
        assert_eq!(report.blocked.len(), 3);
        assert_eq!(
            orchestrator.document_state(&doc).state(SectionKind::Outline),
            SectionState::Failed
        );
    }

    #[tokio::test]
    async fn test_budget_too_small_aborts_run() {
        let collaborator = Arc::new(MockCollaborator::ok());
        let mut config = config();
        config.context.max_input_tokens = Some(20);
        let orchestrator =
            Orchestrator::new(collaborator, Arc::new(MemoryArtifactStore::new()), &config).unwrap();
        let err = orchestrator
            .run_full(&DocumentId::from("doc"), &facts())
            .await
            .unwrap_err();
        assert!(matches!(err, FactweaveError::BudgetTooSmall { .. }));
    }

    #[tokio::test]
    async fn test_documents_run_in_parallel() {
        let (orchestrator, collaborator) = orchestrator(MockCollaborator::ok());
        let facts = facts();
        let a = DocumentId::from("a");
        let b = DocumentId::from("b");
        let (ra, rb) = tokio::join!(
            orchestrator.run_full(&a, &facts),
            orchestrator.run_full(&b, &facts)
        );
        assert!(ra.unwrap().is_complete());
        assert!(rb.unwrap().is_complete());
        assert_eq!(collaborator.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_edit_checks_grounding() {
        let (orchestrator, _) = orchestrator(MockCollaborator::ok());
        let doc = DocumentId::from("doc");
        orchestrator.run_full(&doc, &facts()).await.unwrap();

        // Swap in an editor answer citing a fact that was never offered
        let editing = Orchestrator {
            collaborator: Arc::new(MockCollaborator {
                answer: Some(json!({
                    "edited_text": "Edited",
                    "facts_used": ["models.Invoice"],
                    "changes_made": [],
                    "confidence": 0.7
                })),
                ..MockCollaborator::ok()
            }),
            store: orchestrator.store().clone(),
            builder: orchestrator.builder.clone(),
            practice: orchestrator.practice.clone(),
            retry: orchestrator.retry.clone(),
            outline_excerpt: orchestrator.outline_excerpt,
            synopsis_max_chars: orchestrator.synopsis_max_chars,
            documents: DashMap::new(),
        };

        let strict = GroundedEditor::default().with_level(EnforcementLevel::L2);
        let err = editing.edit(&doc, SectionKind::Theory, &strict).await.unwrap_err();
        assert!(matches!(err, FactweaveError::Grounding(_)));

        let lenient = GroundedEditor::default();
        let outcome = editing.edit(&doc, SectionKind::Theory, &lenient).await.unwrap();
        assert_eq!(outcome.output.edited_text, "Edited");
    }
}
