use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::config::AnalysisConfig;
use crate::constants::scan as scan_constants;
use crate::types::{FactweaveError, Result, log_filter_error};

/// Walks a checked-out repository and lists analyzable files.
///
/// Paths are returned relative to the root, `/`-separated and sorted so
/// every consumer sees the same order on every platform.
pub struct FileScanner {
    root: PathBuf,
    exclude: Vec<glob::Pattern>,
    max_file_size: u64,
    respect_gitignore: bool,
}

impl FileScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exclude: Vec::new(),
            max_file_size: scan_constants::MAX_FILE_SIZE,
            respect_gitignore: true,
        }
    }

    /// Scanner configured from the analysis section
    pub fn from_config<P: AsRef<Path>>(root: P, config: &AnalysisConfig) -> Result<Self> {
        Ok(Self::new(root)
            .with_exclude(&config.exclude)?
            .with_max_file_size(config.max_file_size)
            .respect_gitignore(config.respect_gitignore))
    }

    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| FactweaveError::Pattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn respect_gitignore(mut self, enabled: bool) -> Self {
        self.respect_gitignore = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        // An unreadable root is fatal; individual unreadable entries are skipped
        std::fs::read_dir(&self.root).map_err(|e| {
            FactweaveError::source_unreadable(self.root.display().to_string(), e)
        })?;

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .git_global(false)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !(entry.file_type().is_some_and(|t| t.is_dir())
                    && scan_constants::SKIP_DIRS.contains(&name.as_ref()))
            })
            .build();

        let mut files = Vec::new();

        for entry in walker.filter_map(|e| log_filter_error(e, "Skipping walk entry")) {
            let path = entry.path();

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let Some(relative) = self.relative(path) else {
                continue;
            };

            if self.should_exclude(&relative) {
                continue;
            }

            if let Ok(metadata) = path.metadata() {
                if metadata.len() > self.max_file_size {
                    continue;
                }

                files.push(ScannedFile {
                    path: relative,
                    size: metadata.len(),
                    extension: path
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.to_lowercase()),
                });
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    fn should_exclude(&self, relative: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(relative))
    }
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Repository-relative, `/`-separated path
    pub path: String,
    pub size: u64,
    pub extension: Option<String>,
}
