//! YAML frontmatter handling.
//!
//! Status totals of a markdown file leave out the metadata block at its top:
//! a `---` line, any content, and a closing `---` or `...` line.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SectionCountError;
use crate::Result;

static FRONT_MATTER: LazyLock<std::result::Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(?:.*?\r?\n)?(?:---|\.\.\.)[ \t]*(?:\r?\n|\z)")
});

/// Extensions whose files may carry frontmatter.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Whether `path` names a markdown file.
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// `text` without its leading frontmatter block.
///
/// Text without a closed block at the very start is returned unchanged.
///
/// # Example
///
/// ```rust
/// use sectioncountlib::strip_front_matter;
///
/// let text = "---\ntitle: Notes\ntags: [a, b]\n---\n# Notes\nbody";
/// assert_eq!(strip_front_matter(text).unwrap(), "# Notes\nbody");
/// ```
pub fn strip_front_matter(text: &str) -> Result<&str> {
    let pattern = FRONT_MATTER
        .as_ref()
        .map_err(|e| SectionCountError::Pattern(e.to_string()))?;
    Ok(match pattern.find(text) {
        Some(found) => &text[found.end()..],
        None => text,
    })
}
