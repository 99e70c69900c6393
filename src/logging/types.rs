//! Core logging types: line levels, step results, the run summary and the
//! [`Log`] trait.
use std::fmt;

/// Tracing target of stage headers.
pub const STAGE_TARGET: &str = "provision::stage";

/// Tracing target of reconciliation trace lines.
pub const TRACE_TARGET: &str = "provision::trace";

/// Kind of a log line, independent of where it is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// A major section header.
    Stage,
    /// Regular progress output.
    Info,
    /// Detail shown only with `--verbose`.
    Debug,
    /// Interpreter trace of capability calls (verbose only).
    Trace,
    /// Something unexpected that does not fail the run.
    Warn,
    /// A resource failure.
    Error,
}

impl Level {
    /// Emit `msg` as a [`tracing`] event of this level.
    pub(super) fn emit(self, msg: &str) {
        match self {
            Self::Stage => tracing::info!(target: STAGE_TARGET, "{msg}"),
            Self::Info => tracing::info!("{msg}"),
            Self::Debug => tracing::debug!("{msg}"),
            Self::Trace => tracing::debug!(target: TRACE_TARGET, "{msg}"),
            Self::Warn => tracing::warn!("{msg}"),
            Self::Error => tracing::error!("{msg}"),
        }
    }

    /// Classify a [`tracing`] event by level and target.
    pub(super) fn of(level: tracing::Level, target: &str) -> Self {
        match (level, target) {
            (tracing::Level::ERROR, _) => Self::Error,
            (tracing::Level::WARN, _) => Self::Warn,
            (tracing::Level::INFO, STAGE_TARGET) => Self::Stage,
            (tracing::Level::INFO, _) => Self::Info,
            (_, TRACE_TARGET) => Self::Trace,
            _ => Self::Debug,
        }
    }

    /// Console rendering with ANSI styling.
    pub(super) fn console_line(self, msg: &str) -> String {
        match self {
            Self::Stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Self::Info => format!("  {msg}"),
            Self::Debug => format!("  \x1b[2m{msg}\x1b[0m"),
            Self::Trace => format!("  \x1b[2;36m{msg}\x1b[0m"),
            Self::Warn => format!("\x1b[33mWARN\x1b[0m  {msg}"),
            Self::Error => format!("\x1b[31mERROR\x1b[0m {msg}"),
        }
    }

    /// Plain log-file rendering prefixed with `timestamp`.
    pub(super) fn file_line(self, timestamp: &str, msg: &str) -> String {
        match self {
            Self::Stage => format!("[{timestamp}] ==> {msg}"),
            Self::Info => format!("[{timestamp}]     {msg}"),
            Self::Debug => format!("[{timestamp}]     [debug] {msg}"),
            Self::Trace => format!("[{timestamp}]     [trace] {msg}"),
            Self::Warn => format!("[{timestamp}]     [warn] {msg}"),
            Self::Error => format!("[{timestamp}]     [error] {msg}"),
        }
    }
}

/// Result of one plan node, collected for the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEntry {
    /// Resource name.
    pub name: String,
    /// Final status of the step.
    pub status: StepStatus,
    /// Optional detail message (e.g., skip reason or failure description).
    pub message: Option<String>,
}

impl StepEntry {
    /// Entry for `name` with an optional detail message.
    #[must_use]
    pub fn new(name: &str, status: StepStatus, message: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message,
        }
    }

    /// Colored summary line for this entry.
    pub(super) fn summary_line(&self) -> String {
        let (icon, color) = self.status.marker();
        let suffix = self
            .message
            .as_ref()
            .map_or_else(String::new, |msg| format!(" ({msg})"));
        format!("{color}{icon} {}{suffix}\x1b[0m", self.name)
    }
}

/// Status of a completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The resource reached its target state.
    Ok,
    /// The node is not a reconcilable resource (variables, providers, …).
    NotApplicable,
    /// The step was not run because a dependency failed or execution stopped.
    Skipped,
    /// The resource did not reach its target state.
    Failed,
}

impl StepStatus {
    /// Whether dependents of a step with this status must not run.
    #[must_use]
    pub const fn blocks_dependents(self) -> bool {
        matches!(self, Self::Failed | Self::Skipped)
    }

    /// Summary glyph and ANSI color.
    const fn marker(self) -> (&'static str, &'static str) {
        match self {
            Self::Ok => ("✓", "\x1b[32m"),
            Self::NotApplicable => ("·", "\x1b[2m"),
            Self::Skipped => ("○", "\x1b[33m"),
            Self::Failed => ("✗", "\x1b[31m"),
        }
    }
}

/// Per-status counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Resources that reached their target state.
    pub ok: usize,
    /// Nodes with nothing to reconcile.
    pub not_applicable: usize,
    /// Steps that did not run.
    pub skipped: usize,
    /// Resources that did not converge.
    pub failed: usize,
}

impl Summary {
    /// Count `entries` by status.
    #[must_use]
    pub fn from_entries(entries: &[StepEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut s, e| {
            match e.status {
                StepStatus::Ok => s.ok += 1,
                StepStatus::NotApplicable => s.not_applicable += 1,
                StepStatus::Skipped => s.skipped += 1,
                StepStatus::Failed => s.failed += 1,
            }
            s
        })
    }

    /// Number of counted steps.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.not_applicable + self.skipped + self.failed
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} steps: \x1b[32m{} ok\x1b[0m, \x1b[2m{} n/a\x1b[0m, \x1b[33m{} skipped\x1b[0m, \x1b[31m{} failed\x1b[0m",
            self.total(),
            self.ok,
            self.not_applicable,
            self.skipped,
            self.failed
        )
    }
}

/// Abstraction over logging backends.
///
/// Both [`Logger`](super::logger::Logger) (direct output) and
/// [`BufferedLog`](super::buffered::BufferedLog) (deferred output for
/// parallel steps) implement this trait, allowing execution code to log
/// without knowing whether output is immediate or buffered.
pub trait Log: Send + Sync {
    /// Write one line at `level`.
    fn log(&self, level: Level, msg: &str);

    /// Record a step result for the summary.
    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>);

    /// Log a stage header (major section).
    fn stage(&self, msg: &str) {
        self.log(Level::Stage, msg);
    }

    /// Log an informational message.
    fn info(&self, msg: &str) {
        self.log(Level::Info, msg);
    }

    /// Log a debug message (suppressed on console unless verbose).
    fn debug(&self, msg: &str) {
        self.log(Level::Debug, msg);
    }

    /// Log one interpreter trace line.
    fn trace(&self, msg: &str) {
        self.log(Level::Trace, msg);
    }

    /// Log a warning message.
    fn warn(&self, msg: &str) {
        self.log(Level::Warn, msg);
    }

    /// Log an error message.
    fn error(&self, msg: &str) {
        self.log(Level::Error, msg);
    }
}
