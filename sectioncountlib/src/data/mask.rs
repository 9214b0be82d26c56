//! Comment masking.
//!
//! When comment stripping is enabled, the text of every comment span is
//! removed from a line before it is counted. Masking works one line at a
//! time, so line breaks (and with them line numbering) are never disturbed;
//! a line that masks down to nothing is still a line, with zero counts.

use std::borrow::Cow;

use crate::source::spans::{LineSpan, SpanKind};

/// Removes comment spans from line text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentMasker {
    enabled: bool,
}

impl CommentMasker {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// A masker that leaves every line untouched.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `spans` contain anything this masker would remove.
    pub fn touches(&self, spans: &[LineSpan]) -> bool {
        self.enabled && spans.iter().any(|span| span.kind == SpanKind::Comment)
    }

    /// Text of `line` with its comment spans removed.
    ///
    /// Borrowed when nothing is removed. Span ranges are clamped to the line
    /// and to character boundaries, so a lookup that is slightly out of date
    /// never causes a panic.
    pub fn mask_line<'a>(&self, line: &'a str, spans: &[LineSpan]) -> Cow<'a, str> {
        if !self.touches(spans) {
            return Cow::Borrowed(line);
        }

        let mut out = String::with_capacity(line.len());
        let mut pos = 0;
        for span in spans.iter().filter(|s| s.kind == SpanKind::Comment) {
            let start = floor_boundary(line, span.range.start.max(pos));
            let end = floor_boundary(line, span.range.end.max(start));
            out.push_str(&line[pos..start]);
            pos = end;
        }
        out.push_str(&line[pos..]);
        Cow::Owned(out)
    }
}

fn floor_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
