//! Progress reporting for long-running transfers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// How long a transfer runs before progress is surfaced.
pub const PROGRESS_DELAY: Duration = Duration::from_secs(1);

/// Sink for transfer progress, implemented by the host.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, title: &str);

    /// `total` is `None` when the size is not known up front.
    fn advance(&self, done: u64, total: Option<u64>);

    fn finish(&self);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _title: &str) {}

    fn advance(&self, _done: u64, _total: Option<u64>) {}

    fn finish(&self) {}
}

/// Forwards to a reporter only once the operation has run for [`PROGRESS_DELAY`].
pub struct DelayedProgress<'a> {
    inner: &'a dyn ProgressReporter,
    title: String,
    delay: Duration,
    started_at: Instant,
    shown: AtomicBool,
}

impl<'a> DelayedProgress<'a> {
    pub fn new(inner: &'a dyn ProgressReporter, title: impl Into<String>) -> Self {
        Self::with_delay(inner, title, PROGRESS_DELAY)
    }

    pub fn with_delay(inner: &'a dyn ProgressReporter, title: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner,
            title: title.into(),
            delay,
            started_at: Instant::now(),
            shown: AtomicBool::new(false),
        }
    }

    pub fn is_shown(&self) -> bool {
        self.shown.load(Ordering::Acquire)
    }

    pub fn advance(&self, done: u64, total: Option<u64>) {
        if !self.is_shown() {
            if self.started_at.elapsed() < self.delay {
                return;
            }
            if !self.shown.swap(true, Ordering::AcqRel) {
                self.inner.start(&self.title);
            }
        }
        self.inner.advance(done, total);
    }

    pub fn finish(&self) {
        if self.is_shown() {
            self.inner.finish();
        }
    }
}
