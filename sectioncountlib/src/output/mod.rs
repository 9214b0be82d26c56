//! Output formatting: present counts to a host or a terminal.
//!
//! This module handles the last stage of the pipeline. It provides:
//!
//! - **Annotations**: Positioned display strings for sections and list blocks
//! - **RenderSink**: The host-side receiver of annotation frames
//! - **CountTable**: Table-ready status totals for the CLI
//!
//! Everything here only formats; aggregation happens in `data`.
//!
//! ## Example
//!
//! ```rust
//! use sectioncountlib::data::{Counts, SectionCount};
//! use sectioncountlib::output::AnnotationEmitter;
//! use sectioncountlib::query::SectionCountDisplayMode;
//!
//! let section = SectionCount {
//!     line: 0,
//!     level: 1,
//!     self_counts: Counts::of(2, 7),
//!     total: Counts::of(3, 10),
//!     anchor: 3,
//! };
//! let emitter = AnnotationEmitter::new(SectionCountDisplayMode::Words);
//! let annotations = emitter.emit(&[section], &[]);
//! assert_eq!(annotations[0].text, "2 / 3 words");
//! ```

pub mod annotations;
pub mod table;

pub use annotations::{
    list_text, section_text, Annotation, AnnotationEmitter, RecordingSink, RenderSink,
};
pub use table::{CountTable, TableRow};
