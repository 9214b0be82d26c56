//! Line-indexed document snapshots and the edits that change them.
//!
//! A host editor reports changes as byte-offset replacements ([`Edit`]).
//! The counting engine works per line, so [`Document::apply`] turns every
//! edit into a [`Splice`]: a contiguous range of old lines replaced by the
//! new text of those lines. Splices come out in application order, each one
//! expressed in the coordinates left behind by the previous one.
//!
//! `\n`, `\r\n` and a lone `\r` all end a line. A document always has at
//! least one (possibly empty) line, and a trailing separator opens a final
//! empty line.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::SectionCountError;
use crate::Result;

/// A byte-offset replacement of `from..to` with `insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Start offset (inclusive)
    pub from: usize,
    /// End offset (exclusive)
    pub to: usize,
    /// Replacement text
    #[serde(default)]
    pub insert: String,
}

impl Edit {
    /// Insert `text` at `at`.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            from: at,
            to: at,
            insert: text.into(),
        }
    }

    /// Delete `from..to`.
    pub fn delete(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            insert: String::new(),
        }
    }

    /// Replace `from..to` with `text`.
    pub fn replace(from: usize, to: usize, text: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: text.into(),
        }
    }
}

/// One contiguous line-range replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    /// Lines replaced, in the coordinates before this splice
    pub old: Range<usize>,
    /// Text of the lines that replace them
    pub new_lines: Vec<String>,
}

impl Splice {
    /// Line range covered by the replacement, in the coordinates after this splice.
    pub fn new_range(&self) -> Range<usize> {
        self.old.start..self.old.start + self.new_lines.len()
    }
}

/// An in-memory document with a line index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    /// Byte offset at which each line starts
    starts: Vec<usize>,
}

impl Default for Document {
    fn default() -> Self {
        Self::from_text("")
    }
}

impl Document {
    /// Build a document from its full text.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut starts = vec![0];
        starts.extend(line_breaks(&text).map(|(_, next)| next));
        Self { text, starts }
    }

    /// Full text of the document.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the document in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True when the document has no text (it still has one empty line).
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Text of line `index`, without its separator.
    ///
    /// # Panics
    ///
    /// Panics if `index >= line_count()`.
    pub fn line(&self, index: usize) -> &str {
        &self.text[self.starts[index]..self.line_end(index)]
    }

    /// Iterate over all lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.line_count()).map(move |i| self.line(i))
    }

    /// Byte offset of the start of line `index`.
    pub fn line_start(&self, index: usize) -> usize {
        self.starts[index]
    }

    /// Byte offset of the end of line `index`'s content (before its separator).
    pub fn line_end(&self, index: usize) -> usize {
        match self.starts.get(index + 1) {
            Some(&next) => next - separator_len_before(&self.text, next),
            None => self.text.len(),
        }
    }

    /// Index of the line containing byte offset `pos`.
    ///
    /// Offsets inside a separator belong to the line the separator ends.
    pub fn line_at(&self, pos: usize) -> usize {
        self.starts.partition_point(|&start| start <= pos) - 1
    }

    /// Apply `edits` in order and describe each one as a line splice.
    ///
    /// Every edit's offsets refer to the document as left by the edits before
    /// it. The transaction is all or nothing: if any edit is invalid the
    /// document is left untouched and the error names the offending edit.
    pub fn apply(&mut self, edits: &[Edit]) -> Result<Vec<Splice>> {
        let mut next = self.clone();
        let mut splices = Vec::with_capacity(edits.len());
        for edit in edits {
            splices.push(next.apply_one(edit)?);
        }
        *self = next;
        Ok(splices)
    }

    fn apply_one(&mut self, edit: &Edit) -> Result<Splice> {
        let len = self.text.len();
        if edit.from > edit.to
            || edit.to > len
            || !self.text.is_char_boundary(edit.from)
            || !self.text.is_char_boundary(edit.to)
        {
            return Err(SectionCountError::InvalidEdit {
                from: edit.from,
                to: edit.to,
                len,
            });
        }

        let mut first = self.line_at(edit.from);
        // A lone `\r` before the edit can merge with an inserted `\n`.
        if first > 0 && self.text.as_bytes()[self.starts[first] - 1] == b'\r' {
            first -= 1;
        }
        let last = self.line_at(edit.to);
        let region_start = self.starts[first];
        let old_region_end = self.starts.get(last + 1).copied().unwrap_or(len);
        let is_tail = last + 1 == self.starts.len();

        self.text.replace_range(edit.from..edit.to, &edit.insert);

        let new_region_end = old_region_end + edit.insert.len() - (edit.to - edit.from);
        let region = &self.text[region_start..new_region_end];

        // Line starts of the region, relative to the region.
        let mut region_starts = vec![0];
        region_starts.extend(line_breaks(region).map(|(_, next)| next));
        if !is_tail {
            // The region ends on a separator; the start after it is the
            // unchanged following line.
            region_starts.pop();
        }

        let new_lines: Vec<String> = region_starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = match region_starts.get(i + 1) {
                    Some(&next) => next - separator_len_before(region, next),
                    None if is_tail => region.len(),
                    None => region.len() - separator_len_before(region, region.len()),
                };
                region[start..end].to_string()
            })
            .collect();

        let delta = new_region_end as isize - old_region_end as isize;
        let mut starts: Vec<usize> = Vec::with_capacity(self.starts.len() + new_lines.len());
        starts.extend_from_slice(&self.starts[..first]);
        starts.extend(region_starts.iter().map(|s| region_start + s));
        starts.extend(
            self.starts[last + 1..]
                .iter()
                .map(|&s| (s as isize + delta) as usize),
        );
        self.starts = starts;

        Ok(Splice {
            old: first..last + 1,
            new_lines,
        })
    }
}

/// Yield `(separator_start, next_line_start)` for every line break in `text`.
fn line_breaks(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let bytes = text.as_bytes();
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    i += 1;
                    return Some((i - 1, i));
                }
                b'\r' => {
                    let start = i;
                    i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                    return Some((start, i));
                }
                _ => i += 1,
            }
        }
        None
    })
}

/// Length of the line separator that ends right before `pos`.
fn separator_len_before(text: &str, pos: usize) -> usize {
    let bytes = &text.as_bytes()[..pos];
    if bytes.ends_with(b"\r\n") {
        2
    } else if bytes.ends_with(b"\n") || bytes.ends_with(b"\r") {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(doc: &Document) -> Vec<&str> {
        doc.lines().collect()
    }

    #[test]
    fn test_from_text_lines() {
        let doc = Document::from_text("# A\nfoo bar\r\nbaz\rqux");
        assert_eq!(lines(&doc), vec!["# A", "foo bar", "baz", "qux"]);
        assert_eq!(doc.line_start(1), 4);
        assert_eq!(doc.line_end(1), 11);
        assert_eq!(doc.line_start(2), 13);
    }

    #[test]
    fn test_trailing_newline_opens_empty_line() {
        let doc = Document::from_text("a\n");
        assert_eq!(lines(&doc), vec!["a", ""]);
        assert_eq!(Document::from_text("").line_count(), 1);
    }

    #[test]
    fn test_line_at() {
        let doc = Document::from_text("ab\ncd\n\nef");
        assert_eq!(doc.line_at(0), 0);
        assert_eq!(doc.line_at(2), 0); // the separator
        assert_eq!(doc.line_at(3), 1);
        assert_eq!(doc.line_at(6), 2);
        assert_eq!(doc.line_at(9), 3);
    }

    #[test]
    fn test_insert_within_line() {
        let mut doc = Document::from_text("foo\nbar\nbaz");
        let splices = doc.apply(&[Edit::insert(5, "X")]).unwrap();
        assert_eq!(doc.text(), "foo\nbXar\nbaz");
        assert_eq!(
            splices,
            vec![Splice {
                old: 1..2,
                new_lines: vec!["bXar".to_string()]
            }]
        );
        assert_eq!(lines(&doc), vec!["foo", "bXar", "baz"]);
    }

    #[test]
    fn test_insert_newline_splits_line() {
        let mut doc = Document::from_text("foo\nbar\nbaz");
        let splices = doc.apply(&[Edit::insert(5, "\n## B\n")]).unwrap();
        assert_eq!(splices[0].old, 1..2);
        assert_eq!(splices[0].new_lines, vec!["b", "## B", "ar"]);
        assert_eq!(lines(&doc), vec!["foo", "b", "## B", "ar", "baz"]);
        assert_eq!(doc.line_start(4), doc.text().find("baz").unwrap());
    }

    #[test]
    fn test_delete_joins_lines() {
        let mut doc = Document::from_text("foo\nbar\nbaz");
        let splices = doc.apply(&[Edit::delete(3, 4)]).unwrap();
        assert_eq!(splices[0].old, 0..2);
        assert_eq!(splices[0].new_lines, vec!["foobar"]);
        assert_eq!(lines(&doc), vec!["foobar", "baz"]);
    }

    #[test]
    fn test_edit_at_end_of_document() {
        let mut doc = Document::from_text("foo");
        let splices = doc.apply(&[Edit::insert(3, "\n")]).unwrap();
        assert_eq!(splices[0].old, 0..1);
        assert_eq!(splices[0].new_lines, vec!["foo", ""]);
        assert_eq!(lines(&doc), vec!["foo", ""]);
    }

    #[test]
    fn test_sequential_edits_shift() {
        let mut doc = Document::from_text("a\nb\nc");
        let splices = doc
            .apply(&[Edit::insert(0, "x\n"), Edit::replace(6, 7, "C")])
            .unwrap();
        assert_eq!(doc.text(), "x\na\nb\nC");
        assert_eq!(splices[0].old, 0..1);
        assert_eq!(splices[1].old, 3..4);
        assert_eq!(splices[1].new_lines, vec!["C"]);
    }

    #[test]
    fn test_crlf_preserved() {
        let mut doc = Document::from_text("a\r\nb\r\nc");
        let splices = doc.apply(&[Edit::insert(3, "x")]).unwrap();
        assert_eq!(splices[0].new_lines, vec!["xb"]);
        assert_eq!(lines(&doc), vec!["a", "xb", "c"]);
        assert_eq!(doc.line_end(1), 5);
    }

    #[test]
    fn test_lone_carriage_return_merges_with_inserted_newline() {
        let mut doc = Document::from_text("a\rb");
        let splices = doc.apply(&[Edit::insert(2, "\n")]).unwrap();
        assert_eq!(splices[0].old, 0..2);
        assert_eq!(splices[0].new_lines, vec!["a", "b"]);
        assert_eq!(lines(&doc), vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_edit() {
        let mut doc = Document::from_text("héllo");
        assert!(matches!(
            doc.apply(&[Edit::delete(2, 9)]),
            Err(SectionCountError::InvalidEdit { .. })
        ));
        // Inside the two-byte 'é'
        assert!(doc.apply(&[Edit::delete(2, 3)]).is_err());
        assert_eq!(doc.text(), "héllo");
    }

    #[test]
    fn test_failed_transaction_leaves_document_untouched() {
        let mut doc = Document::from_text("# A\nfoo\nbar");
        let before = doc.clone();

        let result = doc.apply(&[Edit::insert(4, "one two three "), Edit::delete(100, 200)]);

        assert!(matches!(
            result,
            Err(SectionCountError::InvalidEdit { from: 100, .. })
        ));
        assert_eq!(doc, before);
        assert_eq!(doc.line(1), "foo");
    }
}
