//! Positioned annotation strings.
//!
//! Every finalized section and list block becomes one [`Annotation`]: the
//! display text plus the byte offset of the end of its start line, where a
//! host draws it as an inline marker.

use std::ops::Range;

use serde::Serialize;

use crate::data::lists::ListCount;
use crate::data::sections::SectionCount;
use crate::query::options::SectionCountDisplayMode;

/// A display string anchored at the end of a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    /// Start line of the annotated node (0-based)
    pub line: usize,
    /// Byte offset of the end of that line
    pub position: usize,
    /// Rendered text, e.g. `"12 / 40 words"`
    pub text: String,
}

/// Receives the annotation set of the visible part of a document.
pub trait RenderSink {
    fn render(&mut self, annotations: &[Annotation], visible: Range<usize>);
}

/// A sink that keeps the last rendered frame.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub frames: Vec<(Vec<Annotation>, Range<usize>)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotations of the most recent render, if any.
    pub fn last(&self) -> Option<&[Annotation]> {
        self.frames.last().map(|(annotations, _)| annotations.as_slice())
    }
}

impl RenderSink for RecordingSink {
    fn render(&mut self, annotations: &[Annotation], visible: Range<usize>) {
        self.frames.push((annotations.to_vec(), visible));
    }
}

/// `"{self} / {total}"` when the node has direct content that differs from
/// its total, otherwise just the total.
fn self_over_total(own: u64, total: u64) -> String {
    if own != 0 && own != total {
        format!("{own} / {total}")
    } else {
        total.to_string()
    }
}

/// Display text for a section in `mode`, `None` when annotations are off.
pub fn section_text(section: &SectionCount, mode: SectionCountDisplayMode) -> Option<String> {
    match mode {
        SectionCountDisplayMode::Disabled => None,
        SectionCountDisplayMode::Words => Some(format!(
            "{} words",
            self_over_total(section.self_counts.words, section.total.words)
        )),
        SectionCountDisplayMode::Characters => Some(format!(
            "{} chars",
            self_over_total(section.self_counts.chars, section.total.chars)
        )),
    }
}

/// Display text for a list block.
pub fn list_text(list: &ListCount) -> String {
    format!("{} chars", list.total_chars)
}

/// Turns aggregator output into ordered annotations.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationEmitter {
    mode: SectionCountDisplayMode,
}

impl AnnotationEmitter {
    pub fn new(mode: SectionCountDisplayMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> SectionCountDisplayMode {
        self.mode
    }

    /// Merge sections and lists into one sequence ordered by start line.
    ///
    /// The sort is stable and lists go in first, so a list and a section
    /// sharing a line keep the list ahead.
    pub fn emit(&self, sections: &[SectionCount], lists: &[ListCount]) -> Vec<Annotation> {
        if !self.mode.is_enabled() {
            return Vec::new();
        }

        let mut annotations: Vec<Annotation> = lists
            .iter()
            .map(|list| Annotation {
                line: list.line,
                position: list.anchor,
                text: list_text(list),
            })
            .collect();

        annotations.extend(sections.iter().filter_map(|section| {
            section_text(section, self.mode).map(|text| Annotation {
                line: section.line,
                position: section.anchor,
                text,
            })
        }));

        annotations.sort_by_key(|a| a.line);
        annotations
    }
}
