//! Context Command
//!
//! Builds the context pack of one section from a facts document.
//!
//! Usage:
//!   factweave context <facts.json> --section theory [--profile heavy] [--synopsis outline.md]

use std::path::{Path, PathBuf};

use crate::cli::{Output, load_config, read_facts};
use crate::config::{Config, ContextProfile};
use crate::context::{ContextPack, ContextPackBuilder, PackRequest, Synopsis};
use crate::types::{DocumentId, FactweaveError, Result, ResultExt, SectionKind};

pub struct ContextOptions {
    pub facts: PathBuf,
    pub section: SectionKind,
    pub profile: Option<ContextProfile>,
    /// Generated dependency sections; the file stem names the section
    pub synopses: Vec<PathBuf>,
    pub document_id: Option<String>,
    pub format: String,
    pub config: Option<PathBuf>,
}

pub fn run(options: ContextOptions) -> Result<()> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(profile) = options.profile {
        config.context.profile = profile;
    }

    let pack = build_pack(&config, &options)?;

    match options.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&pack)?),
        "text" => print_pack(&pack),
        other => {
            return Err(FactweaveError::Config(format!(
                "Unknown format '{}'. Valid values: text, json",
                other
            )));
        }
    }
    Ok(())
}

fn build_pack(config: &Config, options: &ContextOptions) -> Result<ContextPack> {
    let facts = read_facts(&options.facts)?;
    let mut synopses = options
        .synopses
        .iter()
        .map(|path| read_synopsis(config, options.section, path))
        .collect::<Result<Vec<_>>>()?;
    synopses.sort_by_key(|s| s.section);

    let document_id = options
        .document_id
        .as_deref()
        .map(DocumentId::from)
        .unwrap_or_else(|| DocumentId::from(facts.repo.url.as_str()));

    ContextPackBuilder::new(config.context.budget())
        .with_synopsis_max_chars(config.context.synopsis_max_chars)
        .build(PackRequest {
            document_id: &document_id,
            section: options.section,
            attempt: 1,
            facts: &facts,
            synopses: &synopses,
        })
}

fn read_synopsis(config: &Config, target: SectionKind, path: &Path) -> Result<Synopsis> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| FactweaveError::Config(format!("Cannot name section of {}", path.display())))?;
    let section: SectionKind = stem.parse()?;
    if !target.depends_on(section) {
        return Err(FactweaveError::Config(format!(
            "{} does not depend on {}",
            target, section
        )));
    }

    let text = std::fs::read_to_string(path)
        .with_context_fn(|| format!("Failed to read synopsis {}", path.display()))?;
    Ok(Synopsis::excerpt(
        section,
        &text,
        config.context.outline_excerpt,
        config.context.synopsis_max_chars,
    ))
}

fn print_pack(pack: &ContextPack) {
    let out = Output::new();
    out.header(&format!("Context pack: {}", pack.section));
    out.field("template", format!("{} (v{})", pack.template_id, pack.template_version));
    out.field(
        "tokens",
        format!("{} / {}", pack.estimated_tokens, pack.budget.max_input_tokens),
    );
    out.field(
        "facts",
        format!("{} / {}", pack.selected_keys.len(), pack.budget.max_facts),
    );
    out.field("fingerprint", &pack.fingerprint);

    out.section("Selected facts");
    for key in &pack.selected_keys {
        println!("  {}", key);
    }

    out.section("System prompt");
    println!("{}", pack.system_prompt);
    out.section("User prompt");
    println!("{}", pack.user_prompt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Facts, RepoInfo};
    use tempfile::TempDir;

    fn options(dir: &TempDir, section: SectionKind, synopses: Vec<PathBuf>) -> ContextOptions {
        let facts = Facts::empty(RepoInfo::new("https://example.com/app.git", "abc"));
        let facts_path = dir.path().join("facts.json");
        std::fs::write(&facts_path, serde_json::to_string(&facts).unwrap()).unwrap();
        ContextOptions {
            facts: facts_path,
            section,
            profile: None,
            synopses,
            document_id: Some("doc".to_string()),
            format: "json".to_string(),
            config: None,
        }
    }

    #[test]
    fn test_build_pack_with_synopsis() {
        let dir = TempDir::new().unwrap();
        let outline = dir.path().join("outline.md");
        std::fs::write(&outline, "- Overview of the service\n- Request flow\n- Storage\n").unwrap();

        let opts = options(&dir, SectionKind::Theory, vec![outline]);
        let pack = build_pack(&Config::default(), &opts).unwrap();

        assert_eq!(pack.section, SectionKind::Theory);
        assert_eq!(pack.template_id, "theory.v1");
        assert!(pack.user_prompt.contains("Request flow"));
        assert!(pack.verify_fingerprint().unwrap());
    }

    #[test]
    fn test_synopsis_must_be_a_dependency() {
        let dir = TempDir::new().unwrap();
        let practice = dir.path().join("practice.md");
        std::fs::write(&practice, "- Example\n").unwrap();

        let opts = options(&dir, SectionKind::Theory, vec![practice]);
        assert!(build_pack(&Config::default(), &opts).is_err());
    }
}
