//! Markdown file discovery with glob include/exclude patterns.

use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::SectionCountError;
use crate::Result;

/// Extensions treated as countable text documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Include/exclude patterns applied to discovered paths.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Glob patterns to include (if empty, include every document)
    pub include: Vec<Pattern>,
    /// Glob patterns to exclude
    pub exclude: Vec<Pattern>,
}

impl FilterConfig {
    /// Create a filter that accepts every document file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: &str) -> Result<Self> {
        self.include.push(compile(pattern)?);
        Ok(self)
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        self.exclude.push(compile(pattern)?);
        Ok(self)
    }

    /// Add multiple include patterns.
    pub fn include_many(mut self, patterns: &[&str]) -> Result<Self> {
        for pattern in patterns {
            self = self.include(pattern)?;
        }
        Ok(self)
    }

    /// Add multiple exclude patterns.
    pub fn exclude_many(mut self, patterns: &[&str]) -> Result<Self> {
        for pattern in patterns {
            self = self.exclude(pattern)?;
        }
        Ok(self)
    }

    /// Check if a path passes the filter.
    ///
    /// A path matches if it has a document extension, matches at least one
    /// include pattern (or there are none), and matches no exclude pattern.
    pub fn matches(&self, path: &Path) -> bool {
        if !is_document(path) {
            return false;
        }

        let path_str = path.to_string_lossy();
        if self.exclude.iter().any(|p| p.matches(&path_str)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(&path_str))
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| SectionCountError::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            DOCUMENT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

fn should_skip_dir(name: &str) -> bool {
    // Hidden directories hold editor and tool state, not documents.
    name.starts_with('.') || name == "node_modules"
}

/// Discover document files under `root`.
///
/// A file root is returned as-is when it passes the filter. Results are
/// sorted for deterministic output.
pub fn discover_files(root: impl AsRef<Path>, filter: &FilterConfig) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();

    if !root.exists() {
        return Err(SectionCountError::PathNotFound(root.to_path_buf()));
    }

    if root.is_file() {
        return Ok(if filter.matches(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let walker = WalkDir::new(root).follow_links(true).into_iter();
    let mut files = Vec::new();

    for entry in walker.filter_entry(|e| {
        if e.depth() == 0 || !e.file_type().is_dir() {
            return true;
        }
        !should_skip_dir(e.file_name().to_str().unwrap_or(""))
    }) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::debug!("skipping unreadable entry: {err}");
                continue;
            }
        };

        let path = entry.path();
        if path.is_file() && filter.matches(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_files(dir: &Path) {
        fs::create_dir_all(dir.join("notes/daily")).unwrap();
        fs::create_dir_all(dir.join("drafts")).unwrap();
        fs::create_dir_all(dir.join(".obsidian")).unwrap();

        fs::write(dir.join("README.md"), "# Readme").unwrap();
        fs::write(dir.join("notes/ideas.markdown"), "# Ideas").unwrap();
        fs::write(dir.join("notes/daily/today.md"), "# Today").unwrap();
        fs::write(dir.join("notes/plain.txt"), "plain text").unwrap();
        fs::write(dir.join("drafts/chapter.md"), "# Chapter").unwrap();
        fs::write(dir.join(".obsidian/workspace.md"), "# hidden").unwrap();
        fs::write(dir.join("notes/image.png"), [0u8, 1, 2]).unwrap();
    }

    #[test]
    fn test_filter_matches_document_files() {
        let filter = FilterConfig::new();

        assert!(filter.matches(Path::new("notes/a.md")));
        assert!(filter.matches(Path::new("notes/a.MD")));
        assert!(filter.matches(Path::new("b.markdown")));
        assert!(filter.matches(Path::new("c.txt")));
        assert!(!filter.matches(Path::new("main.rs")));
        assert!(!filter.matches(Path::new("README")));
    }

    #[test]
    fn test_filter_with_include_pattern() {
        let filter = FilterConfig::new().include("**/daily/*.md").unwrap();

        assert!(filter.matches(Path::new("notes/daily/today.md")));
        assert!(!filter.matches(Path::new("notes/ideas.md")));
    }

    #[test]
    fn test_filter_with_multiple_patterns() {
        let filter = FilterConfig::new()
            .include_many(&["**/notes/**", "**/drafts/**"])
            .unwrap()
            .exclude_many(&["**/daily/**"])
            .unwrap();

        assert!(filter.matches(Path::new("vault/notes/ideas.md")));
        assert!(filter.matches(Path::new("vault/drafts/chapter.md")));
        assert!(!filter.matches(Path::new("vault/notes/daily/today.md")));
        assert!(!filter.matches(Path::new("vault/README.md")));
    }

    #[test]
    fn test_discover_files() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let files = discover_files(temp.path(), &FilterConfig::new()).unwrap();

        assert_eq!(files.len(), 5);
        assert!(files.iter().any(|p| p.ends_with("notes/daily/today.md")));
        assert!(files.iter().any(|p| p.ends_with("notes/plain.txt")));
        assert!(!files
            .iter()
            .any(|p| p.to_string_lossy().contains(".obsidian")));
        assert!(!files.iter().any(|p| p.ends_with("notes/image.png")));

        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }

    #[test]
    fn test_discover_files_with_exclude() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let filter = FilterConfig::new().exclude("**/drafts/**").unwrap();
        let files = discover_files(temp.path(), &filter).unwrap();

        assert!(!files.iter().any(|p| p.ends_with("drafts/chapter.md")));
        assert!(files.iter().any(|p| p.ends_with("README.md")));
    }

    #[test]
    fn test_discover_single_file() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("note.md");
        fs::write(&file_path, "words").unwrap();

        let files = discover_files(&file_path, &FilterConfig::new()).unwrap();
        assert_eq!(files, vec![file_path]);
    }

    #[test]
    fn test_discover_files_nonexistent() {
        let result = discover_files("/nonexistent/path", &FilterConfig::new());
        assert!(matches!(result, Err(SectionCountError::PathNotFound(_))));
    }

    #[test]
    fn test_invalid_glob_pattern() {
        let result = FilterConfig::new().include("[invalid");

        if let Err(SectionCountError::InvalidGlob { pattern, .. }) = result {
            assert_eq!(pattern, "[invalid");
        } else {
            panic!("Expected InvalidGlob error");
        }
    }
}
