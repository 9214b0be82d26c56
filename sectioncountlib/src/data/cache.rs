//! Per-line count cache.
//!
//! [`LineStatsCache`] holds one [`LineRecord`] per document line. It is built
//! once per document (or per settings change) and afterwards kept in sync by
//! splicing: replacing the records of the lines an edit touched and nothing
//! else. The section and list aggregators only ever read from this cache, so
//! a keystroke costs a handful of line counts plus one pass of integer
//! additions instead of recounting the document.
//!
//! Splices are computed from the splice text alone (the structural lookup
//! reflects the final document, not intermediate states of a multi-change
//! transaction). Once all splices are in, [`LineStatsCache::remask`]
//! recounts the touched lines against the final document so comment masking
//! is applied, widening the range to every later line whose comment state
//! may have changed.

use std::ops::Range;

use crate::error::SectionCountError;
use crate::source::document::{Document, Splice};
use crate::source::spans::SpanLookup;

use super::mask::CommentMasker;
use super::stats::{Counts, LineRecord};
use super::words::count_text;

/// Cached counts for every line of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStatsCache {
    records: Vec<LineRecord>,
    /// Next line to compute while a chunked rescan is in progress
    rescan_cursor: Option<usize>,
}

impl LineStatsCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached lines.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, indexed by line.
    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    /// Record for `line`, if cached.
    pub fn get(&self, line: usize) -> Option<&LineRecord> {
        self.records.get(line)
    }

    /// Counts for `line`; zero for lines outside the cache.
    pub fn counts(&self, line: usize) -> Counts {
        self.records.get(line).map(|r| r.counts).unwrap_or_default()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.rescan_cursor = None;
    }

    /// Compute the record of every line of `doc` in one go.
    pub fn initialize(&mut self, doc: &Document, spans: &dyn SpanLookup, masker: CommentMasker) {
        self.begin_rescan(doc.line_count());
        self.rescan_step(doc, spans, masker, usize::MAX);
    }

    /// Start a chunked rescan of a document with `line_count` lines.
    ///
    /// Records are zeroed until [`rescan_step`](Self::rescan_step) reaches
    /// them. Splices applied in the meantime keep the cursor aligned.
    pub fn begin_rescan(&mut self, line_count: usize) {
        self.records = vec![LineRecord::default(); line_count];
        self.rescan_cursor = Some(0);
        tracing::debug!(lines = line_count, "line cache rescan started");
    }

    /// Whether a chunked rescan still has lines to compute.
    pub fn is_rescanning(&self) -> bool {
        self.rescan_cursor.is_some()
    }

    /// Compute up to `budget` more lines of a pending rescan.
    ///
    /// Returns `true` once the rescan is complete (or when none was pending).
    pub fn rescan_step(
        &mut self,
        doc: &Document,
        spans: &dyn SpanLookup,
        masker: CommentMasker,
        budget: usize,
    ) -> bool {
        let Some(cursor) = self.rescan_cursor else {
            return true;
        };
        let len = self.records.len().min(doc.line_count());
        let end = cursor.saturating_add(budget).min(len);
        for line in cursor..end {
            self.records[line] = compute_record(doc.line(line), spans, line, masker, None);
        }

        if end >= len {
            self.rescan_cursor = None;
            tracing::debug!(lines = len, "line cache rescan finished");
            true
        } else {
            self.rescan_cursor = Some(end);
            false
        }
    }

    /// Check that `splice` fits the current cache.
    pub fn validate_splice(&self, splice: &Splice) -> crate::Result<()> {
        let len = self.records.len();
        if splice.old.start > splice.old.end || splice.old.end > len {
            return Err(SectionCountError::InvalidSplice {
                start: splice.old.start,
                end: splice.old.end,
                len,
            });
        }
        Ok(())
    }

    /// Replace the records of `splice.old` with records for `splice.new_lines`.
    ///
    /// Returns the touched line range in post-splice coordinates. Cost is
    /// proportional to the size of the splice. A splice outside the cache is
    /// a caller bug: debug builds panic, release builds clamp it.
    pub fn apply_splice(&mut self, splice: &Splice) -> Range<usize> {
        if let Err(err) = self.validate_splice(splice) {
            tracing::error!("{err}");
            if cfg!(debug_assertions) {
                panic!("{err}");
            }
        }
        let end = splice.old.end.min(self.records.len());
        let start = splice.old.start.min(end);

        let records: Vec<LineRecord> = splice
            .new_lines
            .iter()
            .enumerate()
            .map(|(offset, text)| {
                let previous = (start + offset < end).then(|| self.records[start + offset]);
                match count_text(text) {
                    Ok(counts) => LineRecord::plain(counts),
                    Err(err) => {
                        tracing::warn!(line = start + offset, "line count failed: {err}");
                        previous.unwrap_or_default()
                    }
                }
            })
            .collect();

        let inserted = records.len();
        self.records.splice(start..end, records);
        self.shift_rescan_cursor(start..end, inserted);

        tracing::debug!(from = ?(start..end), lines = inserted, "spliced line cache");
        start..start + inserted
    }

    /// Apply `splices` in order and return the union of the touched ranges,
    /// in the coordinates after the last splice.
    pub fn apply_splices(&mut self, splices: &[Splice]) -> Option<Range<usize>> {
        let mut touched: Option<Range<usize>> = None;
        for splice in splices {
            let old_start = splice.old.start.min(self.records.len());
            let old_end = splice.old.end.min(self.records.len()).max(old_start);
            let new = self.apply_splice(splice);
            touched = Some(match touched {
                None => new,
                Some(prev) => {
                    let moved = map_range(prev, old_start..old_end, new.len());
                    moved.start.min(new.start)..moved.end.max(new.end)
                }
            });
        }
        touched
    }

    /// Recount `range` against the current document with masking applied.
    ///
    /// Opening or closing a comment (or a code fence around one) changes the
    /// masking of lines beyond the edit, so the lines after it are swept as
    /// well: every later line that was masked before or carries a comment
    /// span now is recounted. Other lines hold raw counts and stay valid.
    ///
    /// The sweep stops at the first line whose end-of-line block state is
    /// the one recorded before the edit: from there on the structure is
    /// unchanged. Lookups that do not report block state are swept to the
    /// end of the document. Returns the range from the first to the last
    /// recounted line.
    pub fn remask(
        &mut self,
        range: Range<usize>,
        doc: &Document,
        spans: &dyn SpanLookup,
        masker: CommentMasker,
    ) -> Range<usize> {
        let len = self.records.len().min(doc.line_count());
        let end = range.end.min(len);
        let start = range.start.min(end);

        for line in start..end {
            let previous = Some(self.records[line]);
            self.records[line] = compute_record(doc.line(line), spans, line, masker, previous);
        }

        let mut last = end;
        let mut swept = end;
        for line in end..len {
            swept = line + 1;
            let previous = self.records[line];
            let state = if masker.is_enabled() {
                spans.block_state_after(line)
            } else {
                None
            };
            let line_spans = spans.spans_on_line(line);
            if previous.masked || masker.touches(&line_spans) {
                self.records[line] = compute_record(doc.line(line), spans, line, masker, Some(previous));
                last = line + 1;
            } else {
                self.records[line].block_state = state;
            }
            if state.is_some() && state == previous.block_state {
                break;
            }
        }

        if last > end {
            tracing::debug!(from = end, to = last, swept, "widened remask range");
        }
        start..last
    }

    fn shift_rescan_cursor(&mut self, old: Range<usize>, inserted: usize) {
        if let Some(cursor) = self.rescan_cursor {
            self.rescan_cursor = Some(if old.end <= cursor {
                cursor + inserted - old.len()
            } else if old.start < cursor {
                old.start + inserted
            } else {
                cursor
            });
        }
    }
}

/// Map `range` through a splice that replaced `old` with `inserted` lines.
fn map_range(range: Range<usize>, old: Range<usize>, inserted: usize) -> Range<usize> {
    let map = |point: usize, is_end: bool| {
        if point <= old.start {
            point
        } else if point >= old.end {
            point + inserted - old.len()
        } else if is_end {
            old.start + inserted
        } else {
            old.start
        }
    };
    map(range.start, false)..map(range.end, true)
}

/// Count one line, masked. On failure keep `previous` (or zero).
fn compute_record(
    text: &str,
    spans: &dyn SpanLookup,
    line: usize,
    masker: CommentMasker,
    previous: Option<LineRecord>,
) -> LineRecord {
    let (masked, block_state, counts) = if masker.is_enabled() {
        let line_spans = spans.spans_on_line(line);
        let masked_text = masker.mask_line(text, &line_spans);
        (
            masker.touches(&line_spans),
            spans.block_state_after(line),
            count_text(&masked_text),
        )
    } else {
        (false, None, count_text(text))
    };

    match counts {
        Ok(counts) => LineRecord {
            counts,
            masked,
            block_state,
        },
        Err(err) => {
            tracing::warn!(line, "line count failed: {err}");
            previous.unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::document::Edit;
    use crate::source::spans::{MarkdownSpans, NoSpans};

    fn counts(cache: &LineStatsCache) -> Vec<(u64, u64)> {
        cache
            .records()
            .iter()
            .map(|r| (r.counts.words, r.counts.chars))
            .collect()
    }

    fn full(doc: &Document, masker: CommentMasker) -> LineStatsCache {
        let spans = MarkdownSpans::parse(doc);
        let mut cache = LineStatsCache::new();
        cache.initialize(doc, &spans, masker);
        cache
    }

    /// Apply edits incrementally the way the engine does.
    fn edit(cache: &mut LineStatsCache, doc: &mut Document, edits: &[Edit], masker: CommentMasker) {
        let splices = doc.apply(edits).unwrap();
        let spans = MarkdownSpans::parse(doc);
        if let Some(range) = cache.apply_splices(&splices) {
            if masker.is_enabled() {
                cache.remask(range, doc, &spans, masker);
            }
        }
    }

    #[test]
    fn test_initialize() {
        let doc = Document::from_text("# A\nfoo bar\n\nbaz");
        let cache = full(&doc, CommentMasker::disabled());
        assert_eq!(cache.len(), 4);
        assert_eq!(counts(&cache), vec![(1, 3), (2, 7), (0, 0), (1, 3)]);
    }

    #[test]
    fn test_apply_splice_replaces_only_range() {
        let doc = Document::from_text("one\ntwo\nthree");
        let mut cache = full(&doc, CommentMasker::disabled());
        let touched = cache.apply_splice(&Splice {
            old: 1..2,
            new_lines: vec!["two words".into(), "x".into()],
        });
        assert_eq!(touched, 1..3);
        assert_eq!(counts(&cache), vec![(1, 3), (2, 9), (1, 1), (1, 5)]);
    }

    #[test]
    fn test_apply_splices_unions_shifted_ranges() {
        let mut cache = LineStatsCache::new();
        cache.initialize(&Document::from_text("a\nb\nc\nd\ne"), &NoSpans, CommentMasker::disabled());

        let touched = cache.apply_splices(&[
            Splice {
                old: 3..4,
                new_lines: vec!["D".into()],
            },
            Splice {
                old: 0..1,
                new_lines: vec!["x".into(), "y".into(), "z".into()],
            },
        ]);
        // The first splice's line moved from 3 to 5.
        assert_eq!(touched, Some(0..6));
        assert_eq!(cache.len(), 7);
    }

    #[test]
    fn test_whole_line_comment_counts_zero() {
        let doc = Document::from_text("# A\n%%hidden note%%\nvisible");
        let cache = full(&doc, CommentMasker::new(true));
        assert_eq!(counts(&cache), vec![(1, 3), (0, 0), (1, 7)]);
        assert!(cache.get(1).unwrap().masked);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_remask_widens_when_comment_opens() {
        let mut doc = Document::from_text("a b\nc d\ne f\ng h");
        let masker = CommentMasker::new(true);
        let mut cache = full(&doc, masker);

        // Open a comment on line 0 that runs to the end of the document.
        edit(&mut cache, &mut doc, &[Edit::insert(0, "%%")], masker);
        assert_eq!(counts(&cache), vec![(0, 0); 4]);
        assert_eq!(cache, full(&doc, masker));
    }

    #[test]
    fn test_remask_widens_when_comment_closes() {
        let mut doc = Document::from_text("%%a b\nc d\ne f\ng h");
        let masker = CommentMasker::new(true);
        let mut cache = full(&doc, masker);
        assert_eq!(counts(&cache), vec![(0, 0); 4]);

        // Remove the opener: every line becomes countable again.
        edit(&mut cache, &mut doc, &[Edit::delete(0, 2)], masker);
        assert_eq!(counts(&cache), vec![(2, 3); 4]);
        assert_eq!(cache, full(&doc, masker));
    }

    #[test]
    fn test_remask_reaches_comments_behind_new_fence() {
        let mut doc = Document::from_text("intro\nplain\nmore\n%%note here%%\nend");
        let masker = CommentMasker::new(true);
        let mut cache = full(&doc, masker);
        assert_eq!(cache.counts(3).words, 0);

        // Lines after the fence are code now, so the comment is counted.
        edit(&mut cache, &mut doc, &[Edit::insert(6, "```\n")], masker);
        assert_eq!(cache.counts(4).words, 2);
        assert_eq!(cache, full(&doc, masker));
    }

    #[test]
    fn test_remask_stops_once_block_state_matches() {
        let mut doc = Document::from_text("a\n%%x%%\nb\nc\n%%y%%");
        let masker = CommentMasker::new(true);
        let mut cache = full(&doc, masker);

        let splices = doc.apply(&[Edit::insert(1, " b")]).unwrap();
        let spans = MarkdownSpans::parse(&doc);
        let range = cache.apply_splices(&splices).unwrap();
        let recounted = cache.remask(range, &doc, &spans, masker);

        // Line 1 is masked and still recounted; line 4 lies past the point
        // where the structure is known to be unchanged.
        assert_eq!(recounted, 0..2);
        assert_eq!(cache, full(&doc, masker));
    }

    #[test]
    fn test_remask_without_block_state_sweeps_to_end() {
        let mut doc = Document::from_text("a\n%%x%%\nb\nc\n%%y%%");
        let masker = CommentMasker::new(true);
        let mut cache = LineStatsCache::new();
        cache.initialize(&doc, &RawSpans(MarkdownSpans::parse(&doc)), masker);

        let splices = doc.apply(&[Edit::insert(1, " b")]).unwrap();
        let spans = RawSpans(MarkdownSpans::parse(&doc));
        let range = cache.apply_splices(&splices).unwrap();
        assert_eq!(cache.remask(range, &doc, &spans, masker), 0..5);
    }

    /// Spans without block state, like a host that cannot report it.
    struct RawSpans(MarkdownSpans);

    impl SpanLookup for RawSpans {
        fn spans_on_line(&self, line: usize) -> Vec<crate::source::spans::LineSpan> {
            self.0.spans_on_line(line)
        }
    }

    #[test]
    fn test_rescan_in_chunks() {
        let doc = Document::from_text("a\nb b\nc c c\nd\ne");
        let mut cache = LineStatsCache::new();
        cache.begin_rescan(doc.line_count());
        assert!(cache.is_rescanning());
        assert!(!cache.rescan_step(&doc, &NoSpans, CommentMasker::disabled(), 2));
        assert!(!cache.rescan_step(&doc, &NoSpans, CommentMasker::disabled(), 2));
        assert!(cache.rescan_step(&doc, &NoSpans, CommentMasker::disabled(), 2));
        assert!(!cache.is_rescanning());
        assert_eq!(cache, full(&doc, CommentMasker::disabled()));
    }

    #[test]
    fn test_edit_during_rescan_keeps_cursor_aligned() {
        let mut doc = Document::from_text("a\nb\nc\nd\ne\nf");
        let masker = CommentMasker::disabled();
        let mut cache = LineStatsCache::new();
        cache.begin_rescan(doc.line_count());
        cache.rescan_step(&doc, &NoSpans, masker, 3);

        // Insert two lines before the cursor.
        edit(&mut cache, &mut doc, &[Edit::insert(0, "x y\nz\n")], masker);
        while !cache.rescan_step(&doc, &NoSpans, masker, 2) {}
        assert_eq!(cache, full(&doc, masker));
    }

    #[test]
    fn test_validate_splice() {
        let cache = full(&Document::from_text("a\nb"), CommentMasker::disabled());
        assert!(cache
            .validate_splice(&Splice {
                old: 1..2,
                new_lines: vec![]
            })
            .is_ok());
        assert!(matches!(
            cache.validate_splice(&Splice {
                old: 1..5,
                new_lines: vec![]
            }),
            Err(SectionCountError::InvalidSplice { len: 2, .. })
        ));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside the line cache")]
    fn test_out_of_bounds_splice_fails_fast() {
        let mut cache = full(&Document::from_text("a\nb"), CommentMasker::disabled());
        cache.apply_splice(&Splice {
            old: 1..5,
            new_lines: vec!["x".into()],
        });
    }
}
