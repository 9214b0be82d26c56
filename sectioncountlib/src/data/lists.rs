//! Top-level list block aggregation.
//!
//! A top-level list block is a list item at indent 0 together with every
//! nested item and indented continuation line below it. Only blocks that
//! actually have nested content are reported; a lone item is not worth an
//! annotation.
//!
//! The aggregator keeps a single accumulator:
//!
//! - a list item at indent 0 finishes the current block and starts a new one
//! - a deeper list item, or an indented non-list line, joins the block
//! - a blank line is ignored
//! - an unindented, non-blank, non-list line finishes the block

use serde::Serialize;

use crate::source::document::Document;
use crate::source::spans::SpanLookup;

use super::cache::LineStatsCache;

/// Columns a tab expands to when measuring indentation.
pub const TAB_WIDTH: usize = 4;

/// A finalized top-level list block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListCount {
    /// Line of the top-level item (0-based)
    pub line: usize,
    /// Characters of the item and everything nested under it
    pub total_chars: u64,
    /// Whether any nested item or continuation line joined the block
    pub has_child: bool,
    /// Byte offset of the end of the item line
    pub anchor: usize,
}

/// Indent of a list item line, if `text` is one.
///
/// Markers are `-`, `+`, `*`, or digits followed by `.` or `)`, each followed
/// by whitespace. Tabs in the leading whitespace count as [`TAB_WIDTH`]
/// columns.
pub fn list_item_indent(text: &str) -> Option<usize> {
    let rest = text.trim_start();
    let leading = &text[..text.len() - rest.len()];

    let marker_len = match rest.as_bytes().first()? {
        b'-' | b'+' | b'*' => 1,
        b'0'..=b'9' => {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            match rest.as_bytes().get(digits) {
                Some(b'.' | b')') => digits + 1,
                _ => return None,
            }
        }
        _ => return None,
    };

    let after = rest[marker_len..].chars().next()?;
    after.is_whitespace().then(|| indent_width(leading))
}

/// Width of leading whitespace with tabs expanded.
pub fn indent_width(whitespace: &str) -> usize {
    whitespace
        .chars()
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

/// Single-accumulator list aggregator.
#[derive(Debug, Clone, Default)]
pub struct ListAggregator {
    current: Option<ListCount>,
    finished: Vec<ListCount>,
}

impl ListAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The block currently accumulating, if any.
    pub fn current(&self) -> Option<&ListCount> {
        self.current.as_ref()
    }

    /// Feed one line.
    ///
    /// `list_indent` is the item indent when the line is a list item (and not
    /// inside code or math), `chars` its cached character count.
    pub fn line(&mut self, line: usize, text: &str, list_indent: Option<usize>, chars: u64, anchor: usize) {
        match list_indent {
            Some(0) => {
                self.close();
                self.current = Some(ListCount {
                    line,
                    total_chars: chars,
                    has_child: false,
                    anchor,
                });
            }
            Some(_) => {
                if let Some(block) = self.current.as_mut() {
                    block.has_child = true;
                    block.total_chars += chars;
                }
            }
            None => {
                let Some(block) = self.current.as_mut() else {
                    return;
                };
                if text.trim().is_empty() {
                    return;
                }
                if text.starts_with(char::is_whitespace) {
                    block.has_child = true;
                    block.total_chars += chars;
                } else {
                    self.close();
                }
            }
        }
    }

    fn close(&mut self) {
        if let Some(block) = self.current.take() {
            if block.has_child {
                self.finished.push(block);
            }
        }
    }

    /// Finish the open block and return every reported block in line order.
    pub fn finish(mut self) -> Vec<ListCount> {
        self.close();
        self.finished
    }
}

/// Aggregate the top-level list blocks of `lines` from cached line counts.
pub fn aggregate_lists(
    doc: &Document,
    cache: &LineStatsCache,
    spans: &dyn SpanLookup,
    lines: std::ops::Range<usize>,
) -> Vec<ListCount> {
    let mut aggregator = ListAggregator::new();
    let end = lines.end.min(doc.line_count());
    for line in lines.start.min(end)..end {
        let text = doc.line(line);
        aggregator.line(
            line,
            text,
            detect_list_item(doc, spans, line),
            cache.counts(line).chars,
            doc.line_end(line),
        );
    }
    aggregator.finish()
}

pub(crate) fn detect_list_item(doc: &Document, spans: &dyn SpanLookup, line: usize) -> Option<usize> {
    let indent = list_item_indent(doc.line(line))?;
    match spans.kind_at_line_start(line) {
        Some(kind) if kind.is_verbatim() => None,
        _ => Some(indent),
    }
}
