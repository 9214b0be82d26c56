//! The host-facing section counting engine.
//!
//! A host editor owns the document and its syntax tree. It drives the engine
//! through [`EditorHooks`]: every edit transaction is reported as line
//! splices together with the updated document, scrolling is reported as a
//! new visible line range, and `render` is called whenever the host is ready
//! to draw. The engine keeps the per-line count cache current and redraws
//! only when the cache, the visible range, or the settings changed.
//!
//! ```text
//! on_edit ──> LineStatsCache::apply_splices ──> remask (comments on)
//!                                                   │
//! render  <── AnnotationEmitter <── sections + lists (visible start..end)
//! ```
//!
//! Full rescans of long documents are chunked: the host calls
//! [`SectionCountEngine::step_rescan`] between frames and annotations are
//! withheld until the rescan completes.

use std::ops::Range;

use crate::data::cache::LineStatsCache;
use crate::data::lists::{aggregate_lists, ListCount};
use crate::data::mask::CommentMasker;
use crate::data::sections::{aggregate_sections, SectionCount};
use crate::output::annotations::{Annotation, AnnotationEmitter, RenderSink};
use crate::query::options::Settings;
use crate::source::document::{Document, Splice};
use crate::source::spans::SpanLookup;

/// Lifecycle hooks a host editor invokes on the engine.
pub trait EditorHooks {
    /// An edit transaction was applied; `doc` and `spans` describe the result.
    fn on_edit(&mut self, doc: &Document, splices: &[Splice], spans: &dyn SpanLookup);

    /// The visible line range changed.
    fn on_viewport_change(&mut self, visible: Range<usize>);

    /// Redraw into `sink` if anything changed since the last frame.
    ///
    /// Returns whether the sink was called.
    fn render(&mut self, doc: &Document, spans: &dyn SpanLookup, sink: &mut dyn RenderSink) -> bool;
}

/// Incremental per-section counter for one document.
#[derive(Debug, Clone)]
pub struct SectionCountEngine {
    settings: Settings,
    cache: LineStatsCache,
    visible: Range<usize>,
    annotations: Vec<Annotation>,
    dirty: bool,
}

impl SectionCountEngine {
    /// Create an engine for `doc` and compute (or schedule) its line cache.
    pub fn new(settings: Settings, doc: &Document, spans: &dyn SpanLookup) -> Self {
        let mut engine = Self {
            settings,
            cache: LineStatsCache::new(),
            visible: 0..doc.line_count(),
            annotations: Vec::new(),
            dirty: true,
        };
        if engine.settings.section_count_display_mode.is_enabled() {
            engine.rebuild(doc, spans);
        }
        engine
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The per-line count cache.
    pub fn cache(&self) -> &LineStatsCache {
        &self.cache
    }

    /// Annotations of the last render.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn visible(&self) -> Range<usize> {
        self.visible.clone()
    }

    /// Whether the next render will redraw.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether a chunked rescan is still running.
    pub fn is_rescanning(&self) -> bool {
        self.cache.is_rescanning()
    }

    fn masker(&self) -> CommentMasker {
        CommentMasker::new(self.settings.count_comments)
    }

    /// Recompute the whole cache, in one go for short documents and in
    /// chunks otherwise.
    fn rebuild(&mut self, doc: &Document, spans: &dyn SpanLookup) {
        let lines = doc.line_count();
        if lines <= self.settings.rescan_chunk_lines {
            self.cache.initialize(doc, spans, self.masker());
        } else {
            tracing::debug!(lines, "scheduling chunked rescan");
            self.cache.begin_rescan(lines);
        }
        self.dirty = true;
    }

    /// Advance a pending rescan by one chunk.
    ///
    /// Returns `true` once no rescan is pending.
    pub fn step_rescan(&mut self, doc: &Document, spans: &dyn SpanLookup) -> bool {
        if !self.cache.is_rescanning() {
            return true;
        }
        let budget = self.settings.rescan_chunk_lines.max(1);
        let done = self.cache.rescan_step(doc, spans, self.masker(), budget);
        if done {
            self.dirty = true;
        }
        done
    }

    /// Run a pending rescan to completion.
    pub fn finish_rescan(&mut self, doc: &Document, spans: &dyn SpanLookup) {
        while !self.step_rescan(doc, spans) {}
    }

    /// Apply new settings.
    ///
    /// Turning annotations off drops the cache. Turning them on, or toggling
    /// comment stripping, rebuilds it. Any change redraws.
    pub fn on_settings_change(&mut self, settings: Settings, doc: &Document, spans: &dyn SpanLookup) {
        if settings == self.settings {
            return;
        }
        let rescan = self.settings.requires_rescan(&settings);
        self.settings = settings;

        if !self.settings.section_count_display_mode.is_enabled() {
            self.cache.clear();
        } else if rescan {
            self.rebuild(doc, spans);
        }
        self.dirty = true;
    }

    /// Finalized sections of `lines`, from the current cache.
    pub fn sections(&self, doc: &Document, spans: &dyn SpanLookup, lines: Range<usize>) -> Vec<SectionCount> {
        aggregate_sections(doc, &self.cache, spans, lines)
    }

    /// Finalized list blocks of `lines`; empty unless list counts are active.
    pub fn lists(&self, doc: &Document, spans: &dyn SpanLookup, lines: Range<usize>) -> Vec<ListCount> {
        if !self.settings.lists_active() {
            return Vec::new();
        }
        aggregate_lists(doc, &self.cache, spans, lines)
    }

    /// Annotations from the first visible line to the end of the document.
    ///
    /// Sections that start above the viewport are not reported; their
    /// content below it is attributed to nothing.
    pub fn annotate(&self, doc: &Document, spans: &dyn SpanLookup) -> Vec<Annotation> {
        let mode = self.settings.section_count_display_mode;
        if !mode.is_enabled() {
            return Vec::new();
        }
        let lines = self.visible.start.min(doc.line_count())..doc.line_count();
        let sections = self.sections(doc, spans, lines.clone());
        let lists = self.lists(doc, spans, lines);
        AnnotationEmitter::new(mode).emit(&sections, &lists)
    }
}

impl EditorHooks for SectionCountEngine {
    fn on_edit(&mut self, doc: &Document, splices: &[Splice], spans: &dyn SpanLookup) {
        if !self.settings.section_count_display_mode.is_enabled() || splices.is_empty() {
            return;
        }

        if let Some(range) = self.cache.apply_splices(splices) {
            let masker = self.masker();
            let touched = if masker.is_enabled() {
                self.cache.remask(range, doc, spans, masker)
            } else {
                range
            };
            tracing::debug!(lines = ?touched, "line cache updated");
        }

        if self.cache.len() != doc.line_count() {
            tracing::error!(
                cached = self.cache.len(),
                lines = doc.line_count(),
                "line cache out of sync with document, rebuilding"
            );
            self.rebuild(doc, spans);
        }
        self.dirty = true;
    }

    fn on_viewport_change(&mut self, visible: Range<usize>) {
        if visible != self.visible {
            self.visible = visible;
            self.dirty = true;
        }
    }

    fn render(&mut self, doc: &Document, spans: &dyn SpanLookup, sink: &mut dyn RenderSink) -> bool {
        if !self.dirty || self.cache.is_rescanning() {
            return false;
        }
        self.annotations = self.annotate(doc, spans);
        self.dirty = false;
        sink.render(&self.annotations, self.visible.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::annotations::RecordingSink;
    use crate::query::options::SectionCountDisplayMode;
    use crate::source::document::Edit;
    use crate::source::spans::MarkdownSpans;

    fn words() -> Settings {
        Settings::new().mode(SectionCountDisplayMode::Words)
    }

    /// Host-side document plus engine, the way an editor wires them.
    struct Host {
        doc: Document,
        spans: MarkdownSpans,
        engine: SectionCountEngine,
    }

    impl Host {
        fn new(text: &str, settings: Settings) -> Self {
            let doc = Document::from_text(text);
            let spans = MarkdownSpans::parse(&doc);
            let engine = SectionCountEngine::new(settings, &doc, &spans);
            Self { doc, spans, engine }
        }

        fn edit(&mut self, edits: &[Edit]) {
            let splices = self.doc.apply(edits).unwrap();
            self.spans = MarkdownSpans::parse(&self.doc);
            self.engine.on_edit(&self.doc, &splices, &self.spans);
        }

        fn sections(&self) -> Vec<SectionCount> {
            self.engine
                .sections(&self.doc, &self.spans, 0..self.doc.line_count())
        }

        fn render(&mut self, sink: &mut RecordingSink) -> bool {
            self.engine.render(&self.doc, &self.spans, sink)
        }

        fn fresh(&self) -> SectionCountEngine {
            let mut engine = SectionCountEngine::new(self.engine.settings().clone(), &self.doc, &self.spans);
            engine.finish_rescan(&self.doc, &self.spans);
            engine
        }
    }

    fn texts(sink: &RecordingSink) -> Vec<(usize, String)> {
        sink.last()
            .unwrap_or_default()
            .iter()
            .map(|a| (a.line, a.text.clone()))
            .collect()
    }

    #[test]
    fn test_nested_sections_render() {
        let mut host = Host::new("# A\nfoo bar\n## B\nbaz\n# C\nqux quux", words());
        let mut sink = RecordingSink::new();
        assert!(host.render(&mut sink));
        assert_eq!(
            texts(&sink),
            vec![
                (0, "2 / 3 words".to_string()),
                (2, "1 words".to_string()),
                (4, "2 words".to_string()),
            ]
        );
        assert_eq!(sink.last().unwrap()[0].position, 3);
    }

    #[test]
    fn test_inserted_heading_splits_only_enclosing_section() {
        let mut host = Host::new(
            "# A\none two\n# B\nthree four five\nsix\n# C\nseven",
            words(),
        );
        let before = host.sections();

        // "## X\n" before "six" (line 4 starts at byte 32).
        host.edit(&[Edit::insert(32, "## X\n")]);
        let after = host.sections();

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after[0], before[0]);

        let b = &after[1];
        assert_eq!((b.line, b.self_counts.words, b.total.words), (2, 3, 4));
        let x = &after[2];
        assert_eq!((x.line, x.level, x.self_counts.words), (4, 2, 1));

        let c = &after[3];
        assert_eq!(c.line, before[2].line + 1);
        assert_eq!(c.self_counts, before[2].self_counts);
        assert_eq!(c.total, before[2].total);
    }

    #[test]
    fn test_edit_matches_full_rescan() {
        let settings = words().count_comments(true);
        let mut host = Host::new("# A\ntext %%x%%\n## B\n- a\n  - b\n# C\nend", settings);
        host.edit(&[Edit::insert(0, "intro words\n")]);
        host.edit(&[Edit::replace(16, 20, "more %%")]);
        host.edit(&[Edit::delete(0, 3), Edit::insert(5, "\n### D\nd")]);

        let fresh = host.fresh();
        assert_eq!(host.engine.cache(), fresh.cache());
        assert_eq!(
            host.sections(),
            fresh.sections(&host.doc, &host.spans, 0..host.doc.line_count())
        );
    }

    #[test]
    fn test_rejected_transaction_keeps_engine_in_sync() {
        let mut host = Host::new("# A\nfoo\nbar", words());
        let result = host
            .doc
            .apply(&[Edit::insert(4, "one two three "), Edit::delete(100, 200)]);
        assert!(result.is_err());

        // Nothing was applied, so there is nothing to report.
        assert_eq!(host.doc.text(), "# A\nfoo\nbar");
        let fresh = host.fresh();
        assert_eq!(host.engine.cache(), fresh.cache());
        assert_eq!(host.sections()[0].total.words, 2);

        host.edit(&[Edit::insert(4, "one two three ")]);
        assert_eq!(host.sections()[0].total.words, 5);
        assert_eq!(host.engine.cache(), host.fresh().cache());
    }

    #[test]
    fn test_whole_line_comment_keeps_line_numbers() {
        let mut host = Host::new("# A\nfoo\n%%only a comment%%\nbar\n# B\nbaz", words().count_comments(true));
        let sections = host.sections();
        assert_eq!(host.engine.cache().len(), 6);
        assert_eq!(host.engine.cache().counts(2).words, 0);
        assert_eq!(sections[0].total.words, 2);
        assert_eq!(sections[1].line, 4);

        let mut sink = RecordingSink::new();
        host.render(&mut sink);
        assert_eq!(texts(&sink)[1], (4, "1 words".to_string()));
    }

    #[test]
    fn test_render_only_when_something_changed() {
        let mut host = Host::new("# A\nfoo", words());
        let mut sink = RecordingSink::new();

        assert!(host.render(&mut sink));
        assert!(!host.render(&mut sink));

        host.engine.on_viewport_change(0..2);
        assert!(!host.render(&mut sink));
        host.engine.on_viewport_change(1..2);
        assert!(host.render(&mut sink));

        host.edit(&[Edit::insert(7, " bar")]);
        assert!(host.render(&mut sink));

        let doc = host.doc.clone();
        let spans = host.spans.clone();
        host.engine
            .on_settings_change(words().mode(SectionCountDisplayMode::Characters), &doc, &spans);
        assert!(host.render(&mut sink));
        assert_eq!(sink.frames.len(), 4);
    }

    #[test]
    fn test_viewport_start_limits_aggregation() {
        let mut host = Host::new("# A\na\n# B\nb b", words());
        host.engine.on_viewport_change(2..4);
        let mut sink = RecordingSink::new();
        host.render(&mut sink);
        assert_eq!(texts(&sink), vec![(2, "2 words".to_string())]);
        assert_eq!(sink.frames[0].1, 2..4);
    }

    #[test]
    fn test_list_counts_in_character_mode() {
        let settings = Settings::new()
            .mode(SectionCountDisplayMode::Characters)
            .list_counts(true);
        let mut host = Host::new("# L\n- a\n  - b\n- c", settings);
        let mut sink = RecordingSink::new();
        host.render(&mut sink);
        assert_eq!(
            texts(&sink),
            vec![(0, "11 chars".to_string()), (1, "8 chars".to_string())]
        );
    }

    #[test]
    fn test_disabled_renders_nothing_and_drops_cache() {
        let mut host = Host::new("# A\nfoo", words());
        let mut sink = RecordingSink::new();
        host.render(&mut sink);
        assert!(!host.engine.cache().is_empty());

        let doc = host.doc.clone();
        let spans = host.spans.clone();
        host.engine.on_settings_change(Settings::new(), &doc, &spans);
        assert!(host.engine.cache().is_empty());
        assert!(host.render(&mut sink));
        assert!(sink.last().unwrap().is_empty());

        // Edits while disabled are ignored.
        host.edit(&[Edit::insert(0, "x\n")]);
        assert!(host.engine.cache().is_empty());

        host.engine.on_settings_change(words(), &host.doc, &host.spans);
        assert_eq!(host.engine.cache().len(), host.doc.line_count());
    }

    #[test]
    fn test_toggling_comments_rescans() {
        let mut host = Host::new("# A\nfoo %%bar%%", words());
        assert_eq!(host.sections()[0].total.words, 2);

        let doc = host.doc.clone();
        let spans = host.spans.clone();
        host.engine.on_settings_change(words().count_comments(true), &doc, &spans);
        assert_eq!(host.sections()[0].total.words, 1);
    }

    #[test]
    fn test_chunked_rescan_withholds_annotations() {
        let text = (0..10).map(|i| format!("# H{i}\nword")).collect::<Vec<_>>().join("\n");
        let mut host = Host::new(&text, words().rescan_chunk_lines(6));
        let mut sink = RecordingSink::new();
        assert!(host.engine.is_rescanning());
        assert!(!host.render(&mut sink));

        // An edit mid-rescan shifts the cursor.
        assert!(!host.engine.step_rescan(&host.doc, &host.spans));
        host.edit(&[Edit::insert(0, "# Top\nmore words\n")]);
        host.engine.finish_rescan(&host.doc, &host.spans);

        assert!(host.render(&mut sink));
        assert_eq!(sink.last().unwrap().len(), 11);
        assert_eq!(host.engine.cache(), host.fresh().cache());
    }
}
