//! Execution trace hooks for the reconciliation interpreter.
use std::sync::{Mutex, PoisonError};

use crate::logging::Log;

/// One completed evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceStep<'a> {
    /// Nesting depth; the top-level transition is 0.
    pub depth: usize,
    /// Capability or composite name.
    pub call: &'a str,
    /// Whether the evaluation succeeded.
    pub ok: bool,
    /// Outcome message.
    pub message: &'a str,
}

/// Receives interpreter events.
pub trait TraceSink {
    /// A leaf or composite finished.
    fn on_step(&self, step: &TraceStep<'_>);

    /// A composite is about to evaluate its steps.
    fn on_enter(&self, _depth: usize, _name: &str) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {
    fn on_step(&self, _step: &TraceStep<'_>) {}
}

/// Writes events as indented debug lines.
#[derive(Debug)]
pub struct LogTrace<'a, L: Log + ?Sized> {
    log: &'a L,
    resource: &'a str,
}

impl<'a, L: Log + ?Sized> LogTrace<'a, L> {
    /// Trace `resource` through `log`.
    pub const fn new(log: &'a L, resource: &'a str) -> Self {
        Self { log, resource }
    }
}

impl<L: Log + ?Sized> TraceSink for LogTrace<'_, L> {
    fn on_step(&self, step: &TraceStep<'_>) {
        let indent = "  ".repeat(step.depth);
        let status = if step.ok { "ok" } else { "failed" };
        if step.message.is_empty() {
            self.log
                .trace(&format!("{}: {indent}{} {status}", self.resource, step.call));
        } else {
            self.log.trace(&format!(
                "{}: {indent}{} {status}: {}",
                self.resource, step.call, step.message
            ));
        }
    }

    fn on_enter(&self, depth: usize, name: &str) {
        let indent = "  ".repeat(depth);
        self.log
            .trace(&format!("{}: {indent}{name} start", self.resource));
    }
}

/// Owned copy of a trace event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A composite was entered.
    Enter {
        /// Nesting depth.
        depth: usize,
        /// Composite name.
        name: String,
    },
    /// An evaluation finished.
    Step {
        /// Nesting depth.
        depth: usize,
        /// Capability or composite name.
        call: String,
        /// Success flag.
        ok: bool,
        /// Outcome message.
        message: String,
    },
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingTrace {
    events: Mutex<Vec<TraceEvent>>,
}

impl RecordingTrace {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(depth, call)` of every leaf and composite completion.
    #[must_use]
    pub fn calls(&self) -> Vec<(usize, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TraceEvent::Step { depth, call, .. } => Some((depth, call)),
                TraceEvent::Enter { .. } => None,
            })
            .collect()
    }

    fn push(&self, event: TraceEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl TraceSink for RecordingTrace {
    fn on_step(&self, step: &TraceStep<'_>) {
        self.push(TraceEvent::Step {
            depth: step.depth,
            call: step.call.to_string(),
            ok: step.ok,
            message: step.message.to_string(),
        });
    }

    fn on_enter(&self, depth: usize, name: &str) {
        self.push(TraceEvent::Enter {
            depth,
            name: name.to_string(),
        });
    }
}
