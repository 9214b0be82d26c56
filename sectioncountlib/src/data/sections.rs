//! Heading section aggregation.
//!
//! A section is a heading line plus everything up to the next heading of the
//! same or a lower level. Sections nest: a `##` section opened inside a `#`
//! section is its child, and the parent's total includes the child's.
//!
//! The aggregator walks lines in order and keeps the open sections on a
//! stack, deepest last. Each heading line resolves to one
//! [`HeadingTransition`]:
//!
//! ```text
//! open: [# A, ## B, ### C]
//!
//!   ####  -> Push                       [# A, ## B, ### C, #### D]
//!   ###   -> CloseAndMatch { close: 1 } [# A, ## B, ### D]
//!   #     -> CloseAndMatch { close: 3 } [# D]
//!
//! open: [# A, ### C]
//!
//!   ##    -> CloseAndPush { close: 1 }  [# A, ## D]
//! ```
//!
//! Content lines add to the `total` of every open section and to
//! `self_counts` of the deepest one only. Lines before the first heading
//! belong to no section.

use std::ops::Range;

use serde::Serialize;

use crate::source::document::Document;
use crate::source::spans::SpanLookup;

use super::cache::LineStatsCache;
use super::stats::Counts;

/// A finalized heading section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionCount {
    /// Line of the heading (0-based)
    pub line: usize,
    /// Heading level, 1 to 6
    pub level: u8,
    /// Counts of lines directly under this heading, before any child heading
    pub self_counts: Counts,
    /// Self counts plus the totals of all nested sections
    pub total: Counts,
    /// Byte offset of the end of the heading line
    pub anchor: usize,
}

impl SectionCount {
    fn open(line: usize, level: u8, anchor: usize) -> Self {
        Self {
            line,
            level,
            self_counts: Counts::default(),
            total: Counts::default(),
            anchor,
        }
    }
}

/// What a heading of a given level does to the open-section stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingTransition {
    /// Open a deeper section.
    Push,
    /// Close the `close` deepest sections (all deeper than the heading), then open.
    CloseAndPush { close: usize },
    /// Close the `close` deepest sections, the last of which has the
    /// heading's level, then open.
    CloseAndMatch { close: usize },
}

impl HeadingTransition {
    /// Number of open sections this transition finalizes.
    pub fn closes(self) -> usize {
        match self {
            HeadingTransition::Push => 0,
            HeadingTransition::CloseAndPush { close } | HeadingTransition::CloseAndMatch { close } => {
                close
            }
        }
    }
}

/// Resolve a heading of `level` against the open levels (outermost first).
pub fn transition(open_levels: &[u8], level: u8) -> HeadingTransition {
    let deeper = open_levels
        .iter()
        .rev()
        .take_while(|&&open| open > level)
        .count();
    let next = open_levels.len() - deeper;

    if next > 0 && open_levels[next - 1] == level {
        HeadingTransition::CloseAndMatch { close: deeper + 1 }
    } else if deeper > 0 {
        HeadingTransition::CloseAndPush { close: deeper }
    } else {
        HeadingTransition::Push
    }
}

/// Level of an ATX heading line: 1 to 6 `#` followed by a space or tab.
pub fn heading_level(text: &str) -> Option<u8> {
    let hashes = text.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    match text.as_bytes().get(hashes) {
        Some(b' ' | b'\t') => Some(hashes as u8),
        _ => None,
    }
}

/// Stack-based section aggregator.
#[derive(Debug, Clone, Default)]
pub struct SectionAggregator {
    open: Vec<SectionCount>,
    finished: Vec<SectionCount>,
}

impl SectionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Levels of the currently open sections, outermost first.
    pub fn open_levels(&self) -> Vec<u8> {
        self.open.iter().map(|s| s.level).collect()
    }

    /// Handle a heading line.
    pub fn heading(&mut self, line: usize, level: u8, anchor: usize) -> HeadingTransition {
        let levels = self.open_levels();
        let step = transition(&levels, level);
        for _ in 0..step.closes() {
            if let Some(section) = self.open.pop() {
                self.finished.push(section);
            }
        }
        self.open.push(SectionCount::open(line, level, anchor));
        step
    }

    /// Handle a non-heading line with the given counts.
    pub fn content(&mut self, counts: Counts) {
        let Some((deepest, outer)) = self.open.split_last_mut() else {
            return;
        };
        deepest.self_counts += counts;
        deepest.total += counts;
        for section in outer {
            section.total += counts;
        }
    }

    /// Close every open section and return all sections ordered by line.
    pub fn finish(mut self) -> Vec<SectionCount> {
        while let Some(section) = self.open.pop() {
            self.finished.push(section);
        }
        self.finished.sort_by_key(|s| s.line);
        self.finished
    }
}

/// Aggregate the sections of `lines` from cached line counts.
///
/// Headings are detected on the raw line text; lines that start inside code
/// or math are always content.
pub fn aggregate_sections(
    doc: &Document,
    cache: &LineStatsCache,
    spans: &dyn SpanLookup,
    lines: Range<usize>,
) -> Vec<SectionCount> {
    let mut aggregator = SectionAggregator::new();
    let end = lines.end.min(doc.line_count());
    for line in lines.start.min(end)..end {
        match detect_heading(doc, spans, line) {
            Some(level) => {
                aggregator.heading(line, level, doc.line_end(line));
            }
            None => aggregator.content(cache.counts(line)),
        }
    }
    aggregator.finish()
}

pub(crate) fn detect_heading(doc: &Document, spans: &dyn SpanLookup, line: usize) -> Option<u8> {
    let level = heading_level(doc.line(line))?;
    match spans.kind_at_line_start(line) {
        Some(kind) if kind.is_verbatim() => None,
        _ => Some(level),
    }
}
