//! Generate Command
//!
//! Runs the document pipeline against an external generator program.
//!
//! The program is spawned once per call. It receives
//! `{system_prompt, user_prompt, schema}` as JSON on stdin and answers on
//! stdout with `{text, facts_used}` JSON or plain text.
//!
//! Usage:
//!   factweave generate <facts.json> --command <program> [--arg ARG]... [--output DIR]
//!                      [--only <section>] [--edit <section>] [--level L2]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::cli::{Output, load_config, read_facts, write_text};
use crate::pipeline::{
    Artifact, CommandCollaborator, DocumentState, EditOutcome, GroundedEditor, MemoryArtifactStore,
    Orchestrator, RunReport,
};
use crate::types::{DocumentId, FactweaveError, Result, SectionKind};
use crate::validation::EnforcementLevel;

pub struct GenerateOptions {
    pub facts: PathBuf,
    pub command: String,
    pub args: Vec<String>,
    pub output: PathBuf,
    /// Generate this section and the sections it depends on
    pub only: Option<SectionKind>,
    /// Run the grounded editor over this section afterwards
    pub edit: Option<SectionKind>,
    pub level: Option<EnforcementLevel>,
    pub document_id: Option<String>,
    pub config: Option<PathBuf>,
}

/// Contents of `run.json`
#[derive(Debug, Serialize)]
struct RunSummary {
    document_id: DocumentId,
    command: String,
    report: Option<RunReport>,
    state: DocumentState,
    artifacts: Vec<ArtifactSummary>,
    edit: Option<EditOutcome>,
}

#[derive(Debug, Serialize)]
struct ArtifactSummary {
    key: String,
    file: String,
    template_id: String,
    template_version: u32,
    fingerprint: String,
    facts_used: Vec<String>,
    tries: u32,
    practice_score: Option<f64>,
    practice_valid: Option<bool>,
}

impl ArtifactSummary {
    fn new(artifact: &Artifact) -> Self {
        Self {
            key: artifact.key.to_string(),
            file: section_file(artifact.section()),
            template_id: artifact.template_id.clone(),
            template_version: artifact.template_version,
            fingerprint: artifact.fingerprint.clone(),
            facts_used: artifact.facts_used.iter().map(|k| k.to_string()).collect(),
            tries: artifact.tries,
            practice_score: artifact.practice.as_ref().map(|p| p.score),
            practice_valid: artifact.practice.as_ref().map(|p| p.valid),
        }
    }
}

fn section_file(section: SectionKind) -> String {
    format!("{}.md", section)
}

pub async fn run(options: GenerateOptions) -> Result<()> {
    let out = Output::new();
    let config = load_config(options.config.as_deref())?;
    let facts = read_facts(&options.facts)?;
    let document_id = options
        .document_id
        .as_deref()
        .map(DocumentId::from)
        .unwrap_or_else(|| DocumentId::from(facts.repo.url.as_str()));

    let collaborator = CommandCollaborator::new(&options.command, options.args.clone());
    let store = Arc::new(MemoryArtifactStore::new());
    let orchestrator = Orchestrator::new(Arc::new(collaborator), store, &config)?;

    out.header(&format!("Generating {}", document_id));

    let report = match options.only {
        Some(target) => {
            for section in SectionKind::ALL
                .into_iter()
                .filter(|s| *s == target || target.depends_on(*s))
            {
                orchestrator.regenerate(&document_id, section, &facts).await?;
                out.success(&format!("Generated {}", section));
            }
            None
        }
        None => {
            let report = orchestrator.run_full(&document_id, &facts).await?;
            print_report(&out, &report);
            Some(report)
        }
    };

    let edit = match options.edit {
        Some(section) => {
            let mut editor = GroundedEditor::from_config(&config.editor)?;
            if let Some(level) = options.level {
                editor = editor.with_level(level);
            }
            let outcome = orchestrator.edit(&document_id, section, &editor).await?;
            write_text(
                &options.output.join(format!("{}.edited.md", section)),
                &outcome.output.edited_text,
            )?;
            out.success(&format!(
                "Edited {} ({} change(s), confidence {:.2})",
                section,
                outcome.output.changes_made.len(),
                outcome.output.clamped_confidence()
            ));
            Some(outcome)
        }
        None => None,
    };

    let artifacts = write_artifacts(&orchestrator, &document_id, &options.output)?;

    let summary = RunSummary {
        document_id: document_id.clone(),
        command: options.command.clone(),
        report: report.clone(),
        state: orchestrator.document_state(&document_id),
        artifacts,
        edit,
    };
    write_text(
        &options.output.join("run.json"),
        &serde_json::to_string_pretty(&summary)?,
    )?;
    out.success(&format!("Output written to {}", options.output.display()));

    match report {
        Some(report) if !report.is_complete() => Err(FactweaveError::Context(format!(
            "{} section(s) failed, {} blocked",
            report.failed.len(),
            report.blocked.len()
        ))),
        _ => Ok(()),
    }
}

/// Latest artifact of every section as markdown, with its context pack
fn write_artifacts(
    orchestrator: &Orchestrator,
    document_id: &DocumentId,
    dir: &Path,
) -> Result<Vec<ArtifactSummary>> {
    let store = orchestrator.store();
    let mut summaries = Vec::new();

    for section in SectionKind::ALL {
        let Some(artifact) = store.latest(document_id, section)? else {
            continue;
        };
        write_text(&dir.join(section_file(section)), &artifact.text)?;
        if let Some(pack) = store.get_pack(&artifact.key)? {
            write_text(
                &dir.join("packs").join(format!("{}.json", section)),
                &serde_json::to_string_pretty(&pack)?,
            )?;
        }
        summaries.push(ArtifactSummary::new(&artifact));
    }

    Ok(summaries)
}

fn print_report(out: &Output, report: &RunReport) {
    for section in &report.generated {
        out.success(&format!("Generated {}", section));
    }
    for failure in &report.failed {
        out.error(&format!("{} failed: {}", failure.section, failure.error));
    }
    for section in &report.blocked {
        out.warning(&format!("{} blocked by a failed dependency", section));
    }
    out.info(&format!("Finished in {} ms", report.duration_ms));
}
