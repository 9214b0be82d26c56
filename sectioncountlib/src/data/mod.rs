//! Counting: per-line records and the aggregates built from them.
//!
//! This module handles the second stage of the pipeline - turning document
//! lines into counts and rolling them up. It provides:
//!
//! - **Words**: The word pattern and character counting (`count_text`)
//! - **Cache**: One `LineRecord` per line, kept current by splices
//! - **Mask**: Comment stripping that never disturbs line boundaries
//! - **Sections / Lists**: Aggregators over cached line counts
//! - **Worker**: Whole-document word counting on a background thread
//!
//! ## Example
//!
//! ```rust
//! use sectioncountlib::data::{aggregate_sections, CommentMasker, LineStatsCache};
//! use sectioncountlib::source::{Document, MarkdownSpans};
//!
//! let doc = Document::from_text("# A\nfoo bar\n## B\nbaz");
//! let spans = MarkdownSpans::parse(&doc);
//! let mut cache = LineStatsCache::new();
//! cache.initialize(&doc, &spans, CommentMasker::disabled());
//!
//! let sections = aggregate_sections(&doc, &cache, &spans, 0..doc.line_count());
//! assert_eq!(sections[0].total.words, 3);
//! ```

pub mod cache;
pub mod lists;
pub mod mask;
pub mod sections;
pub mod stats;
pub mod words;
pub mod worker;

pub use cache::LineStatsCache;
pub use lists::{aggregate_lists, list_item_indent, ListAggregator, ListCount};
pub use mask::CommentMasker;
pub use sections::{
    aggregate_sections, heading_level, transition, HeadingTransition, SectionAggregator,
    SectionCount,
};
pub use stats::{Counts, LineRecord};
pub use words::{count_chars, count_text, count_words, word_pattern};
pub use worker::{
    BackgroundCounter, CountBackend, CountReply, CountRequest, Debouncer, DEFAULT_DEBOUNCE,
};
