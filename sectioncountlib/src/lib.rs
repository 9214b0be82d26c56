//! # sectioncountlib
//!
//! Live word and character statistics for markdown documents, broken down
//! per heading section and per top-level list block.
//!
//! ## Overview
//!
//! A document being edited changes on every keystroke, and recounting it
//! from scratch each time does not scale. This library keeps one cached
//! count per line and updates only the lines an edit touched:
//!
//! - **Sections**: A heading plus everything up to the next heading of the
//!   same or a lower level, with `self` and `total` counts
//! - **Lists**: A top-level list item plus its nested items and indented
//!   continuation lines (character counts)
//! - **Comments**: `%% %%` and `<!-- -->` spans can be left out of every count
//! - **Status totals**: Whole-document word counts on a background thread,
//!   with stale replies discarded by sequence number
//!
//! ## Features
//!
//! - **Incremental**: Edits cost time proportional to the lines they touch
//! - **Host-driven**: Editors plug in through `EditorHooks`, `SpanLookup`
//!   and `RenderSink`; nothing is read from global state
//! - **Unicode-aware**: Han, Hiragana and Katakana count one word per character
//! - **Pure data**: Returns structured values, no terminal I/O
//!
//! ## Example
//!
//! ```rust
//! use sectioncountlib::{
//!     Document, Edit, EditorHooks, MarkdownSpans, RecordingSink, SectionCountDisplayMode,
//!     SectionCountEngine, Settings,
//! };
//!
//! let mut doc = Document::from_text("# A\nfoo bar\n## B\nbaz");
//! let mut spans = MarkdownSpans::parse(&doc);
//! let settings = Settings::new().mode(SectionCountDisplayMode::Words);
//! let mut engine = SectionCountEngine::new(settings, &doc, &spans);
//!
//! let splices = doc.apply(&[Edit::insert(doc.len(), " qux")]).unwrap();
//! spans = MarkdownSpans::parse(&doc);
//! engine.on_edit(&doc, &splices, &spans);
//!
//! let mut sink = RecordingSink::new();
//! engine.render(&doc, &spans, &mut sink);
//! let texts: Vec<_> = engine.annotations().iter().map(|a| a.text.as_str()).collect();
//! assert_eq!(texts, ["2 / 4 words", "2 words"]);
//!
//! assert_eq!(sectioncountlib::count_words("日本語 and English").unwrap(), 5);
//! ```

pub mod data;
pub mod engine;
pub mod error;
pub mod output;
pub mod query;
pub mod source;

pub use data::{
    count_chars, count_text, count_words, BackgroundCounter, CommentMasker, CountBackend,
    CountReply, Counts, Debouncer, LineStatsCache, ListCount, SectionCount,
};
pub use engine::{EditorHooks, SectionCountEngine};
pub use error::SectionCountError;
pub use output::{Annotation, AnnotationEmitter, CountTable, RecordingSink, RenderSink};
pub use query::{SectionCountDisplayMode, Settings, StatusConsumer, StatusTotals, StatusTracker};
pub use source::{
    discover_files, is_markdown, strip_front_matter, Document, Edit, FilterConfig, LineSpan,
    MarkdownSpans, NoSpans, SpanKind, SpanLookup, Splice,
};

/// Result type for sectioncountlib operations
pub type Result<T> = std::result::Result<T, SectionCountError>;
