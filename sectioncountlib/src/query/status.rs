//! Status totals for the whole document or the current selection.
//!
//! Characters are cheap and updated on every change. Words come from the
//! background counter: text is debounced, dispatched with a sequence
//! number, and a reply is applied only if it answers the most recent
//! dispatch. A late reply for an older text is dropped, so the displayed
//! total never regresses to a previous document state.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::data::words::{count_chars, count_text};
use crate::data::worker::{CountBackend, CountReply, Debouncer};
use crate::Result;

use super::options::Settings;

/// Totals shown by a status consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    pub words: u64,
    pub characters: u64,
}

impl StatusTotals {
    /// Pages at `page_words` words per page, rounded up.
    pub fn pages(&self, page_words: u64) -> u64 {
        if page_words == 0 {
            return 0;
        }
        self.words.div_ceil(page_words)
    }
}

/// Receives totals whenever they change.
pub trait StatusConsumer {
    fn update(&mut self, totals: StatusTotals);
}

impl<F: FnMut(StatusTotals)> StatusConsumer for F {
    fn update(&mut self, totals: StatusTotals) {
        self(totals)
    }
}

/// Document totals kept current through the background counter.
#[derive(Debug)]
pub struct StatusTracker {
    totals: StatusTotals,
    debouncer: Debouncer<String>,
    /// Sequence number of the most recent dispatch still worth applying
    latest: Option<u64>,
}

impl StatusTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            totals: StatusTotals::default(),
            debouncer: Debouncer::new(debounce),
            latest: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(Duration::from_millis(settings.debounce_ms))
    }

    /// Current document totals.
    pub fn totals(&self) -> StatusTotals {
        self.totals
    }

    /// Whether a dispatch is still waiting for its reply.
    pub fn is_waiting(&self) -> bool {
        self.latest.is_some()
    }

    /// Whether text is waiting for the debounce interval.
    pub fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// When the pending text becomes due for dispatch.
    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Record a new document text.
    ///
    /// Characters are updated right away. Word counting is deferred to the
    /// next due [`flush`](Self::flush), except for empty text which is zero
    /// words without asking the worker.
    pub fn update_text(&mut self, text: &str, now: Instant, consumer: &mut dyn StatusConsumer) {
        self.totals.characters = count_chars(text);
        if text.is_empty() {
            self.debouncer.flush();
            // Anything still in flight describes older text.
            self.latest = None;
            self.totals.words = 0;
        } else {
            self.debouncer.push(text.to_string(), now);
        }
        consumer.update(self.totals);
    }

    /// Dispatch the pending text if the debounce interval has elapsed.
    ///
    /// Returns the sequence number of the dispatch, if one happened.
    pub fn flush(&mut self, now: Instant, backend: &mut dyn CountBackend) -> Result<Option<u64>> {
        match self.debouncer.poll(now) {
            Some(text) => self.dispatch(text, backend).map(Some),
            None => Ok(None),
        }
    }

    /// Dispatch the pending text regardless of the debounce interval.
    pub fn flush_now(&mut self, backend: &mut dyn CountBackend) -> Result<Option<u64>> {
        match self.debouncer.flush() {
            Some(text) => self.dispatch(text, backend).map(Some),
            None => Ok(None),
        }
    }

    fn dispatch(&mut self, text: String, backend: &mut dyn CountBackend) -> Result<u64> {
        let seq = backend.submit(text)?;
        tracing::debug!(seq, "dispatched background count");
        self.latest = Some(seq);
        Ok(seq)
    }

    /// Apply `reply` if it answers the latest dispatch.
    ///
    /// Returns whether the word total changed.
    pub fn accept(&mut self, reply: CountReply) -> bool {
        if self.latest != Some(reply.seq) {
            tracing::debug!(
                seq = reply.seq,
                latest = ?self.latest,
                "discarding stale count reply"
            );
            return false;
        }
        self.latest = None;
        let changed = self.totals.words != reply.words;
        self.totals.words = reply.words;
        changed
    }

    /// Apply every reply that has already arrived and notify `consumer` on change.
    pub fn drain(&mut self, backend: &mut dyn CountBackend, consumer: &mut dyn StatusConsumer) -> bool {
        let mut changed = false;
        while let Some(reply) = backend.try_recv() {
            changed |= self.accept(reply);
        }
        if changed {
            consumer.update(self.totals);
        }
        changed
    }

    /// Wait up to `timeout` for the latest dispatch to be answered.
    ///
    /// Stale replies received in the meantime are discarded.
    pub fn wait(
        &mut self,
        backend: &mut dyn CountBackend,
        timeout: Duration,
        consumer: &mut dyn StatusConsumer,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_waiting() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(reply) = backend.recv_timeout(remaining) else {
                break;
            };
            if self.accept(reply) {
                consumer.update(self.totals);
            }
        }
        !self.is_waiting()
    }

    /// Totals of the selected text, counted directly.
    ///
    /// An empty selection shows the document totals again. A counting
    /// failure leaves the consumer untouched.
    pub fn selection(&self, text: &str, consumer: &mut dyn StatusConsumer) -> Result<StatusTotals> {
        let totals = if text.is_empty() {
            self.totals
        } else {
            let counts = count_text(text)?;
            StatusTotals {
                words: counts.words,
                characters: counts.chars,
            }
        };
        consumer.update(totals);
        Ok(totals)
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
