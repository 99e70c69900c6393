//! Per-resource output buffering for the parallel scheduler.
use std::sync::{Arc, Mutex, PoisonError};

use super::logger::Logger;
use super::types::{Level, Log, StepStatus};

/// Holds one resource's log lines until it finishes reconciling.
///
/// Resources running on separate threads would otherwise interleave their
/// trace lines on the console.  Lines are replayed in order by
/// [`flush_and_complete`](Self::flush_and_complete); results passed to
/// [`record_step`](Log::record_step) go straight to the backing [`Logger`].
#[derive(Debug)]
pub struct BufferedLog {
    inner: Arc<Logger>,
    lines: Mutex<Vec<(Level, String)>>,
}

impl BufferedLog {
    /// An empty buffer in front of `inner`.
    #[must_use]
    pub const fn new(inner: Arc<Logger>) -> Self {
        Self {
            inner,
            lines: Mutex::new(Vec::new()),
        }
    }

    fn take(&self) -> Vec<(Level, String)> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Buffered message texts in order (test-only).
    #[cfg(test)]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    /// Replay the buffered lines and take `resource` off the progress line.
    pub fn flush_and_complete(&self, resource: &str) {
        let lines = self.take();
        self.inner.complete_step(resource, || {
            for (level, msg) in &lines {
                level.emit(msg);
            }
        });
    }
}

impl Log for BufferedLog {
    fn log(&self, level: Level, msg: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, msg.to_string()));
    }

    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        self.inner.record_step(name, status, message);
    }
}
