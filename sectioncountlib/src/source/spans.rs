//! Structural span lookup.
//!
//! The engine never parses markdown itself. It asks a [`SpanLookup`] which
//! structural spans (code, math, comment, heading) touch a given line, and
//! uses the answer twice: comment spans are masked out before counting, and
//! lines that start inside code or math are never treated as headings or
//! list items.
//!
//! Editors usually own a syntax tree and implement the trait on top of it.
//! [`MarkdownSpans`] is a small line-oriented implementation for hosts that
//! have none (the CLI, tests).

use std::ops::Range;

use super::document::Document;

/// Kind of a structural span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Fenced code block
    Code,
    /// `$$` math block
    Math,
    /// `%% %%` or `<!-- -->` comment
    Comment,
    /// ATX heading line
    Heading,
}

impl SpanKind {
    /// Whether lines starting inside this span are opaque to heading/list detection.
    pub fn is_verbatim(self) -> bool {
        matches!(self, SpanKind::Code | SpanKind::Math)
    }
}

/// A span restricted to one line, as a byte range within the line text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpan {
    pub kind: SpanKind,
    pub range: Range<usize>,
}

impl LineSpan {
    pub fn new(kind: SpanKind, range: Range<usize>) -> Self {
        Self { kind, range }
    }
}

/// Read-only oracle over the structure of the current document.
pub trait SpanLookup {
    /// Spans touching line `line`, ordered by start column.
    fn spans_on_line(&self, line: usize) -> Vec<LineSpan>;

    /// Fingerprint of the parser state carried from the end of `line` into
    /// the next one, if the lookup tracks it.
    ///
    /// Equal fingerprints at the same line of two parses mean everything
    /// after that line is structured identically, provided its text did not
    /// change. `None` means unknown.
    fn block_state_after(&self, _line: usize) -> Option<u64> {
        None
    }

    /// Kind of the span covering the first column of `line`, if any.
    fn kind_at_line_start(&self, line: usize) -> Option<SpanKind> {
        self.spans_on_line(line)
            .into_iter()
            .find(|span| span.range.start == 0)
            .map(|span| span.kind)
    }
}

/// A lookup that reports no structure at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpans;

impl SpanLookup for NoSpans {
    fn spans_on_line(&self, _line: usize) -> Vec<LineSpan> {
        Vec::new()
    }
}

/// Comment delimiters recognized by [`MarkdownSpans`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    Percent,
    Html,
}

impl CommentStyle {
    fn open(self) -> &'static str {
        match self {
            CommentStyle::Percent => "%%",
            CommentStyle::Html => "<!--",
        }
    }

    fn close(self) -> &'static str {
        match self {
            CommentStyle::Percent => "%%",
            CommentStyle::Html => "-->",
        }
    }
}

/// Block state carried from one line to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Text,
    Fence { marker: u8, len: usize },
    Math,
    Comment(CommentStyle),
}

impl BlockState {
    fn fingerprint(self) -> u64 {
        match self {
            BlockState::Text => 0,
            BlockState::Math => 1,
            BlockState::Comment(CommentStyle::Percent) => 2,
            BlockState::Comment(CommentStyle::Html) => 3,
            BlockState::Fence { marker, len } => 4 | (u64::from(marker) << 8) | ((len as u64) << 16),
        }
    }
}

/// Line-oriented structural parse of a markdown document.
#[derive(Debug, Clone, Default)]
pub struct MarkdownSpans {
    lines: Vec<Vec<LineSpan>>,
    /// State at the end of each line
    states: Vec<BlockState>,
}

impl MarkdownSpans {
    /// Scan `doc` and record the spans of every line.
    pub fn parse(doc: &Document) -> Self {
        let mut state = BlockState::Text;
        let mut states = Vec::with_capacity(doc.line_count());
        let lines = doc
            .lines()
            .map(|line| {
                let (spans, next) = scan_line(line, state);
                state = next;
                states.push(next);
                spans
            })
            .collect();
        Self { lines, states }
    }
}

impl SpanLookup for MarkdownSpans {
    fn spans_on_line(&self, line: usize) -> Vec<LineSpan> {
        self.lines.get(line).cloned().unwrap_or_default()
    }

    fn block_state_after(&self, line: usize) -> Option<u64> {
        self.states.get(line).map(|state| state.fingerprint())
    }
}

fn scan_line(line: &str, state: BlockState) -> (Vec<LineSpan>, BlockState) {
    let whole = 0..line.len();
    match state {
        BlockState::Fence { marker, len } => {
            let next = match fence(line) {
                Some((m, l)) if m == marker && l >= len && line.trim_start()[l..].trim().is_empty() => {
                    BlockState::Text
                }
                _ => state,
            };
            (vec![LineSpan::new(SpanKind::Code, whole)], next)
        }
        BlockState::Math => {
            let next = if line.contains("$$") {
                BlockState::Text
            } else {
                state
            };
            (vec![LineSpan::new(SpanKind::Math, whole)], next)
        }
        BlockState::Comment(style) => scan_text(line, 0, Some(style)),
        BlockState::Text => {
            if let Some((marker, len)) = fence(line) {
                return (
                    vec![LineSpan::new(SpanKind::Code, whole)],
                    BlockState::Fence { marker, len },
                );
            }
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix("$$") {
                let next = if rest.contains("$$") {
                    BlockState::Text
                } else {
                    BlockState::Math
                };
                return (vec![LineSpan::new(SpanKind::Math, whole)], next);
            }
            let (mut spans, next) = scan_text(line, 0, None);
            if is_atx_heading(line) {
                spans.insert(0, LineSpan::new(SpanKind::Heading, whole));
            }
            (spans, next)
        }
    }
}

/// Find comment spans in ordinary text, starting at `from`, optionally
/// already inside a comment that opened on an earlier line.
fn scan_text(line: &str, from: usize, open: Option<CommentStyle>) -> (Vec<LineSpan>, BlockState) {
    let mut spans = Vec::new();
    let mut pos = from;
    let mut current = open;

    loop {
        match current {
            Some(style) => {
                let start = pos;
                match line[pos..].find(style.close()) {
                    Some(offset) => {
                        let end = pos + offset + style.close().len();
                        spans.push(LineSpan::new(SpanKind::Comment, start..end));
                        pos = end;
                        current = None;
                    }
                    None => {
                        spans.push(LineSpan::new(SpanKind::Comment, start..line.len()));
                        return (spans, BlockState::Comment(style));
                    }
                }
            }
            None => {
                let percent = line[pos..].find("%%").map(|i| (i, CommentStyle::Percent));
                let html = line[pos..].find("<!--").map(|i| (i, CommentStyle::Html));
                let next = match (percent, html) {
                    (Some(p), Some(h)) => Some(if p.0 <= h.0 { p } else { h }),
                    (p, h) => p.or(h),
                };
                match next {
                    Some((offset, style)) => {
                        let start = pos + offset;
                        let body = start + style.open().len();
                        match line[body..].find(style.close()) {
                            Some(close) => {
                                let end = body + close + style.close().len();
                                spans.push(LineSpan::new(SpanKind::Comment, start..end));
                                pos = end;
                            }
                            None => {
                                spans.push(LineSpan::new(SpanKind::Comment, start..line.len()));
                                return (spans, BlockState::Comment(style));
                            }
                        }
                    }
                    None => return (spans, BlockState::Text),
                }
            }
        }
    }
}

/// Opening/closing fence: up to three spaces, then three or more backticks or tildes.
fn fence(line: &str) -> Option<(u8, usize)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = line[indent..].as_bytes();
    let marker = *rest.first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let len = rest.iter().take_while(|&&b| b == marker).count();
    (len >= 3).then_some((marker, len))
}

fn is_atx_heading(line: &str) -> bool {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    (1..=6).contains(&hashes) && matches!(line.as_bytes().get(hashes), Some(b' ' | b'\t'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> MarkdownSpans {
        MarkdownSpans::parse(&Document::from_text(text))
    }

    #[test]
    fn test_fenced_code() {
        let spans = parse("text\n```rust\n# not a heading\n```\nafter");
        assert_eq!(spans.kind_at_line_start(0), None);
        assert_eq!(spans.kind_at_line_start(1), Some(SpanKind::Code));
        assert_eq!(spans.kind_at_line_start(2), Some(SpanKind::Code));
        assert_eq!(spans.kind_at_line_start(3), Some(SpanKind::Code));
        assert_eq!(spans.kind_at_line_start(4), None);
    }

    #[test]
    fn test_fence_needs_matching_marker() {
        let spans = parse("~~~~\n```\n~~~~\nout");
        assert_eq!(spans.kind_at_line_start(1), Some(SpanKind::Code));
        assert_eq!(spans.kind_at_line_start(2), Some(SpanKind::Code));
        assert_eq!(spans.kind_at_line_start(3), None);
    }

    #[test]
    fn test_math_block() {
        let spans = parse("$$\n# x^2\n$$\n# Real");
        assert_eq!(spans.kind_at_line_start(1), Some(SpanKind::Math));
        assert_eq!(spans.kind_at_line_start(2), Some(SpanKind::Math));
        assert_eq!(spans.kind_at_line_start(3), Some(SpanKind::Heading));
    }

    #[test]
    fn test_inline_comments() {
        let spans = parse("keep %%drop%% keep <!-- gone --> end");
        let line = spans.spans_on_line(0);
        assert_eq!(
            line,
            vec![
                LineSpan::new(SpanKind::Comment, 5..13),
                LineSpan::new(SpanKind::Comment, 19..32),
            ]
        );
    }

    #[test]
    fn test_multiline_comment() {
        let spans = parse("a %%start\nmiddle\n\nend%% b\nafter");
        assert_eq!(
            spans.spans_on_line(0),
            vec![LineSpan::new(SpanKind::Comment, 2..9)]
        );
        assert_eq!(
            spans.spans_on_line(1),
            vec![LineSpan::new(SpanKind::Comment, 0..6)]
        );
        assert_eq!(
            spans.spans_on_line(2),
            vec![LineSpan::new(SpanKind::Comment, 0..0)]
        );
        assert_eq!(
            spans.spans_on_line(3),
            vec![LineSpan::new(SpanKind::Comment, 0..5)]
        );
        assert!(spans.spans_on_line(4).is_empty());
    }

    #[test]
    fn test_heading_span() {
        let spans = parse("# Title\n####### seven\n#nospace");
        assert_eq!(spans.kind_at_line_start(0), Some(SpanKind::Heading));
        assert_eq!(spans.kind_at_line_start(1), None);
        assert_eq!(spans.kind_at_line_start(2), None);
    }

    #[test]
    fn test_no_spans() {
        assert!(NoSpans.spans_on_line(3).is_empty());
        assert_eq!(NoSpans.kind_at_line_start(0), None);
        assert_eq!(NoSpans.block_state_after(0), None);
    }

    #[test]
    fn test_block_state_after_tracks_open_blocks() {
        let spans = parse("text
```
code
```
%% open
close %%
$$
x");
        let text = spans.block_state_after(0);
        assert!(text.is_some());
        assert_ne!(spans.block_state_after(1), text);
        assert_eq!(spans.block_state_after(2), spans.block_state_after(1));
        assert_eq!(spans.block_state_after(3), text);
        assert_ne!(spans.block_state_after(4), text);
        assert_eq!(spans.block_state_after(5), text);
        assert_ne!(spans.block_state_after(6), spans.block_state_after(4));
        assert_eq!(spans.block_state_after(8), None);
    }
}
