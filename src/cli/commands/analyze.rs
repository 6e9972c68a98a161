//! Analyze Command
//!
//! Runs the detector set over a repository and writes its facts document.
//!
//! Usage:
//!   factweave analyze <path> [--repo-url URL] [--commit SHA] [--output facts.json] [--format json|yaml]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::analyzer::{FactAggregator, FsSourceTree};
use crate::cli::{Output, load_config, write_text};
use crate::types::{FactweaveError, Facts, RepoInfo, Result};

pub struct AnalyzeOptions {
    pub path: PathBuf,
    pub repo_url: Option<String>,
    pub commit: Option<String>,
    pub output: Option<PathBuf>,
    pub format: String,
    pub config: Option<PathBuf>,
}

pub async fn run(options: AnalyzeOptions) -> Result<()> {
    let out = Output::new();
    let config = load_config(options.config.as_deref())?;

    let root = options.path.canonicalize().map_err(|e| {
        FactweaveError::source_unreadable(options.path.display().to_string(), e)
    })?;
    let repo_url = match options.repo_url {
        Some(url) => normalize_repo_url(&url)?,
        None => local_repo_url(&root),
    };
    let commit = options
        .commit
        .or_else(|| read_head_commit(&root))
        .unwrap_or_else(|| "unknown".to_string());

    let tree = FsSourceTree::with_config(&root, &config.analysis)?;
    let facts = FactAggregator::new(Arc::new(tree))
        .analyze(RepoInfo::new(repo_url, commit))
        .await?;

    let rendered = render(&facts, &options.format)?;
    match &options.output {
        Some(path) => {
            write_text(path, &rendered)?;
            print_summary(&out, &facts);
            out.success(&format!("Facts written to {}", path.display()));
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

fn render(facts: &Facts, format: &str) -> Result<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(facts)?),
        "yaml" => Ok(serde_yaml::to_string(facts)?),
        other => Err(FactweaveError::Config(format!(
            "Unknown format '{}'. Valid values: json, yaml",
            other
        ))),
    }
}

fn print_summary(out: &Output, facts: &Facts) {
    out.section("Facts");
    out.field("repo", &facts.repo.url);
    out.field("commit", &facts.repo.commit);
    out.field("architecture", &facts.architecture.arch_type);
    let languages: Vec<String> = facts
        .languages
        .iter()
        .map(|l| format!("{} ({:.0}%)", l.name, l.ratio * 100.0))
        .collect();
    out.field("languages", languages.join(", "));
    out.field("frameworks", facts.frameworks.len());
    out.field("modules", facts.modules.len());
    out.field("endpoints", facts.api.endpoints.len());
    out.field("models", facts.models.len());

    for partial in &facts.partial {
        out.warning(&format!("{} is incomplete: {}", partial.facet, partial.reason));
    }
}

/// Accept URLs with a scheme as well as scp-style `user@host:path` remotes
fn normalize_repo_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.contains("://") {
        let url = Url::parse(raw)
            .map_err(|e| FactweaveError::Config(format!("Invalid repository URL '{}': {}", raw, e)))?;
        return Ok(url.to_string());
    }
    match raw.split_once(':') {
        Some((host, path)) if host.contains('@') && !path.is_empty() => Ok(raw.to_string()),
        _ => Err(FactweaveError::Config(format!(
            "Invalid repository URL '{}'",
            raw
        ))),
    }
}

fn local_repo_url(root: &Path) -> String {
    Url::from_directory_path(root)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| root.display().to_string())
}

/// Commit checked out in `root`, read from `.git/HEAD` without invoking git
fn read_head_commit(root: &Path) -> Option<String> {
    let git_dir = root.join(".git");
    let head = std::fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let head = head.trim();

    let Some(reference) = head.strip_prefix("ref: ") else {
        return Some(head.to_string());
    };

    if let Ok(commit) = std::fs::read_to_string(git_dir.join(reference)) {
        return Some(commit.trim().to_string());
    }

    // Packed refs: "<sha> <ref>" lines
    let packed = std::fs::read_to_string(git_dir.join("packed-refs")).ok()?;
    packed
        .lines()
        .filter_map(|line| line.split_once(' '))
        .find(|(_, name)| *name == reference)
        .map(|(sha, _)| sha.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_repo_url() {
        assert_eq!(
            normalize_repo_url("https://github.com/org/repo.git").unwrap(),
            "https://github.com/org/repo.git"
        );
        assert_eq!(
            normalize_repo_url("git@github.com:org/repo.git").unwrap(),
            "git@github.com:org/repo.git"
        );
        assert!(normalize_repo_url("not a url").is_err());
        assert!(normalize_repo_url("http://").is_err());
    }

    #[test]
    fn test_read_head_commit() {
        let dir = TempDir::new().unwrap();
        assert!(read_head_commit(dir.path()).is_none());

        let git = dir.path().join(".git");
        std::fs::create_dir_all(git.join("refs/heads")).unwrap();
        std::fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        std::fs::write(
            git.join("packed-refs"),
            "# pack-refs with: peeled\n1111 refs/heads/main\n",
        )
        .unwrap();
        assert_eq!(read_head_commit(dir.path()).as_deref(), Some("1111"));

        std::fs::write(git.join("refs/heads/main"), "2222\n").unwrap();
        assert_eq!(read_head_commit(dir.path()).as_deref(), Some("2222"));

        std::fs::write(git.join("HEAD"), "3333\n").unwrap();
        assert_eq!(read_head_commit(dir.path()).as_deref(), Some("3333"));
    }

    #[tokio::test]
    async fn test_run_writes_facts_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "flask==3.0\n").unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "version = \"1.0\"\n").unwrap();
        let output = dir.path().join("out/facts.json");

        run(AnalyzeOptions {
            path: dir.path().to_path_buf(),
            repo_url: Some("https://example.com/app.git".to_string()),
            commit: Some("abc123".to_string()),
            output: Some(output.clone()),
            format: "json".to_string(),
            config: Some(config_path),
        })
        .await
        .unwrap();

        let facts: Facts =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(facts.repo.commit, "abc123");
        assert!(facts.languages.iter().any(|l| l.name == "python"));
    }
}
