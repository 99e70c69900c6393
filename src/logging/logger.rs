//! Console logger with summary collection and a live progress line for
//! resources reconciled in parallel.
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::types::{Level, Log, StepEntry, StepStatus, Summary};
use super::utils::{log_file_path, terminal_columns, truncate_to_width};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resources currently running on the parallel scheduler and whether their
/// names are shown on the console.
#[derive(Debug, Default)]
struct Progress {
    active: Vec<String>,
    shown: bool,
}

/// Structured logger with summary collection.
///
/// Every line also reaches `$XDG_CACHE_HOME/provision/<command>.log` through
/// the [`FileLayer`](super::subscriber::FileLayer), regardless of `--verbose`.
#[derive(Debug)]
pub struct Logger {
    results: Mutex<Vec<StepEntry>>,
    log_file: Option<PathBuf>,
    /// Held while console output is written so parallel flushes never
    /// interleave with the progress line.
    progress: Mutex<Progress>,
}

impl Logger {
    /// Create a logger for `command`.
    ///
    /// Only remembers the log file path for the summary; the file itself is
    /// opened by [`init_subscriber`](super::subscriber::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
            progress: Mutex::new(Progress::default()),
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Every recorded result in recording order.
    #[must_use]
    pub fn step_entries(&self) -> Vec<StepEntry> {
        lock(&self.results).clone()
    }

    /// Per-status counts of the recorded results.
    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary::from_entries(&lock(&self.results))
    }

    /// Return `true` if any recorded step has failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Number of failed resources.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.summary().failed
    }

    /// Print every recorded result followed by the status counts.
    #[allow(clippy::print_stdout)]
    pub fn print_summary(&self) {
        let entries = self.step_entries();
        if entries.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");
        for entry in &entries {
            self.info(&entry.summary_line());
        }
        println!();
        self.info(&Summary::from_entries(&entries).to_string());

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }

    /// Mark `name` as running and redraw the progress line.
    pub fn notify_step_start(&self, name: &str) {
        let mut progress = lock(&self.progress);
        Self::clear_progress(&mut progress);
        progress.active.push(name.to_string());
        Self::draw_progress(&mut progress);
    }

    /// Run `replay` with the progress line hidden, then drop `name` from the
    /// running set and redraw whatever is still running.
    pub(super) fn complete_step(&self, name: &str, replay: impl FnOnce()) {
        let mut progress = lock(&self.progress);
        Self::clear_progress(&mut progress);
        replay();
        progress.active.retain(|n| n != name);
        Self::draw_progress(&mut progress);
    }

    /// Erase the progress line if it is shown.
    #[allow(clippy::print_stdout)]
    fn clear_progress(progress: &mut Progress) {
        if progress.shown {
            print!("\r\x1b[K");
            std::io::stdout().flush().ok();
            progress.shown = false;
        }
    }

    /// Show the running resources on a single row.
    #[allow(clippy::print_stdout)]
    fn draw_progress(progress: &mut Progress) {
        if progress.active.is_empty() {
            return;
        }
        let names = truncate_to_width(&progress.active.join(", "), terminal_columns().saturating_sub(4));
        print!("  \x1b[2m▹ {names}\x1b[0m");
        std::io::stdout().flush().ok();
        progress.shown = true;
    }

    #[cfg(test)]
    pub(super) fn progress_shown(&self) -> bool {
        lock(&self.progress).shown
    }

    #[cfg(test)]
    pub(super) fn running(&self) -> Vec<String> {
        lock(&self.progress).active.clone()
    }
}

impl Log for Logger {
    fn log(&self, level: Level, msg: &str) {
        level.emit(msg);
    }

    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        lock(&self.results).push(StepEntry::new(name, status, message.map(String::from)));
    }
}
