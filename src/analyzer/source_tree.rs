//! Read-only repository access
//!
//! Detectors never touch the filesystem directly; they go through
//! [`SourceTree`], which supports enumeration, content retrieval and
//! line counting. [`FsSourceTree`] reads a checked-out directory,
//! [`MemorySourceTree`] serves content the caller already holds.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::config::AnalysisConfig;
use crate::types::{FactweaveError, Result};

use super::scanner::FileScanner;

pub trait SourceTree: Send + Sync {
    /// Human-readable location, used in logs and errors
    fn location(&self) -> String;

    /// All files, repository-relative, `/`-separated, sorted
    fn files(&self) -> Result<Vec<String>>;

    fn read(&self, path: &str) -> Result<String>;

    fn exists(&self, path: &str) -> bool {
        self.read(path).is_ok()
    }

    /// Count code lines: non-blank lines that are not comment-only
    fn line_count(&self, path: &str) -> Result<u64> {
        Ok(count_code_lines(&self.read(path)?))
    }
}

/// Count non-blank lines that do not start with a comment marker
pub fn count_code_lines(content: &str) -> u64 {
    content
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with('#')
                && !line.starts_with("//")
                && !line.starts_with("/*")
                && !line.starts_with('*')
        })
        .count() as u64
}

// =============================================================================
// Filesystem Tree
// =============================================================================

pub struct FsSourceTree {
    scanner: FileScanner,
}

impl FsSourceTree {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            scanner: FileScanner::new(root),
        }
    }

    pub fn with_config<P: AsRef<Path>>(root: P, config: &AnalysisConfig) -> Result<Self> {
        Ok(Self {
            scanner: FileScanner::from_config(root, config)?,
        })
    }

    pub fn root(&self) -> &Path {
        self.scanner.root()
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        // Only plain relative paths inside the tree
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FactweaveError::NotFound(path.to_string()));
        }
        Ok(self.root().join(relative))
    }
}

impl SourceTree for FsSourceTree {
    fn location(&self) -> String {
        self.root().display().to_string()
    }

    fn files(&self) -> Result<Vec<String>> {
        Ok(self.scanner.scan()?.into_iter().map(|f| f.path).collect())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|p| p.is_file())
    }

    fn read(&self, path: &str) -> Result<String> {
        let bytes = std::fs::read(self.resolve(path)?)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

// =============================================================================
// In-Memory Tree
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemorySourceTree {
    files: BTreeMap<String, String>,
}

impl MemorySourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl SourceTree for MemorySourceTree {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn files(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read(&self, path: &str) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| FactweaveError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}
