//! Background full-document word counting.
//!
//! Counting a whole document on every keystroke is too slow for the editing
//! thread, so the status total is computed on a dedicated worker thread. The
//! two sides share nothing: requests and replies travel over channels, and
//! every request carries a sequence number so the caller can tell a late
//! reply for an old document apart from the current one.
//!
//! The caller throttles dispatch with a [`Debouncer`]: rapid edits keep
//! replacing the pending text and only the last one is sent once input has
//! been quiet for the debounce interval.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::SectionCountError;
use crate::Result;

use super::words::count_words;

/// Quiet interval before a debounced dispatch.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// A counting request sent to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountRequest {
    pub seq: u64,
    pub text: String,
}

/// The worker's answer to a [`CountRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountReply {
    pub seq: u64,
    pub words: u64,
}

/// Asynchronous word counting capability.
pub trait CountBackend {
    /// Queue `text` for counting and return the sequence number of the request.
    fn submit(&mut self, text: String) -> Result<u64>;

    /// A reply, if one has arrived.
    fn try_recv(&mut self) -> Option<CountReply>;

    /// Wait up to `timeout` for a reply.
    fn recv_timeout(&mut self, timeout: Duration) -> Option<CountReply>;
}

/// Word counter running on its own thread.
///
/// Dropping the counter never blocks: the thread is detached and finishes on
/// its own. Call [`shutdown`](Self::shutdown) to wait for it instead.
pub struct BackgroundCounter {
    requests: Option<Sender<CountRequest>>,
    replies: Receiver<CountReply>,
    last_seq: u64,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundCounter {
    /// Start a worker that counts with the standard word pattern.
    pub fn spawn() -> Result<Self> {
        Self::with_counter(count_words)
    }

    /// Start a worker that counts with `count`.
    pub fn with_counter<F>(count: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<u64> + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("word-counter".to_string())
            .spawn(move || worker_loop(request_rx, reply_tx, count))?;

        Ok(Self {
            requests: Some(request_tx),
            replies: reply_rx,
            last_seq: 0,
            handle: Some(handle),
        })
    }

    /// Sequence number of the most recent request.
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }
}

impl CountBackend for BackgroundCounter {
    fn submit(&mut self, text: String) -> Result<u64> {
        let requests = self
            .requests
            .as_ref()
            .ok_or(SectionCountError::WorkerUnavailable)?;
        let seq = self.last_seq + 1;
        requests
            .send(CountRequest { seq, text })
            .map_err(|_| SectionCountError::WorkerUnavailable)?;
        self.last_seq = seq;
        Ok(seq)
    }

    fn try_recv(&mut self) -> Option<CountReply> {
        self.replies.try_recv().ok()
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Option<CountReply> {
        match self.replies.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl BackgroundCounter {
    /// Stop the worker and wait for it to exit.
    ///
    /// Blocks until every request already submitted has been counted.
    pub fn shutdown(mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("word counter thread exited abnormally");
            }
        }
    }
}

impl Drop for BackgroundCounter {
    fn drop(&mut self) {
        // Detach: the worker exits once its next reply finds no receiver.
        self.requests.take();
        self.handle.take();
    }
}

fn worker_loop<F>(requests: Receiver<CountRequest>, replies: Sender<CountReply>, count: F)
where
    F: Fn(&str) -> Result<u64>,
{
    for request in requests {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| count(&request.text)));
        let words = match outcome {
            Ok(Ok(words)) => words,
            Ok(Err(err)) => {
                tracing::warn!(seq = request.seq, "background count failed: {err}");
                continue;
            }
            Err(_) => {
                tracing::error!(seq = request.seq, "background count panicked");
                continue;
            }
        };
        if replies
            .send(CountReply {
                seq: request.seq,
                words,
            })
            .is_err()
        {
            break;
        }
    }
}

/// Coalesces rapid updates into one value delivered after a quiet interval.
///
/// Time is passed in explicitly so callers decide where it comes from.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    interval: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replace the pending value and restart the quiet interval.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((now, value));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(at, _)| *at + self.interval)
    }

    /// Take the pending value if the quiet interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self.deadline().is_some_and(|deadline| now >= deadline);
        if due {
            self.pending.take().map(|(_, value)| value)
        } else {
            None
        }
    }

    /// Take the pending value regardless of time.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
