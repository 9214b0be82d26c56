//! Where text comes from.
//!
//! This module handles the first stage of the pipeline - the document being
//! edited and what is known about its structure. It provides:
//!
//! - **Document**: Line-indexed snapshot that turns byte edits into line splices
//! - **Spans**: The structural lookup consulted for comments, code, and math
//! - **File filtering**: Markdown file discovery with glob patterns
//! - **Frontmatter**: The YAML block left out of status totals
//!
//! ## Example
//!
//! ```rust
//! use sectioncountlib::source::{Document, Edit, MarkdownSpans, SpanKind, SpanLookup};
//!
//! let mut doc = Document::from_text("# Title\n```\n# not a heading\n```");
//! let spans = MarkdownSpans::parse(&doc);
//! assert_eq!(spans.kind_at_line_start(2), Some(SpanKind::Code));
//!
//! let splices = doc.apply(&[Edit::insert(7, "\nmore")]).unwrap();
//! assert_eq!(splices[0].old, 0..1);
//! assert_eq!(doc.line_count(), 5);
//! ```

pub mod document;
pub mod filter;
pub mod frontmatter;
pub mod spans;

pub use document::{Document, Edit, Splice};
pub use filter::{discover_files, FilterConfig, DOCUMENT_EXTENSIONS};
pub use frontmatter::{is_markdown, strip_front_matter, MARKDOWN_EXTENSIONS};
pub use spans::{LineSpan, MarkdownSpans, NoSpans, SpanKind, SpanLookup};
