//! Dependency-driven parallel step scheduling.
//!
//! Every plan node gets its own scoped OS thread which blocks until all of
//! its dependencies have finished.  Output is buffered per step and flushed
//! to the console as soon as the step completes.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use super::{FailurePolicy, Plan, skip};
use crate::logging::{BufferedLog, Log, Logger, StepEntry, StepStatus};
use crate::resources::registry::Registry;

/// Completion statuses shared between step threads.
///
/// Steps call [`wait_for`](Self::wait_for) before starting and
/// [`mark_complete`](Self::mark_complete) when finished.  The [`Condvar`]
/// wakes every waiter whenever a new completion is recorded.
#[derive(Debug, Default)]
struct CompletionBoard {
    completed: Mutex<HashMap<String, StepStatus>>,
    condvar: Condvar,
}

impl CompletionBoard {
    fn new() -> Self {
        Self::default()
    }

    /// Block until every step in `deps` has completed; return their statuses.
    fn wait_for(&self, deps: &[&str]) -> HashMap<String, StepStatus> {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !deps.iter().all(|d| completed.contains_key(*d)) {
            completed = self
                .condvar
                .wait(completed)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let statuses = deps
            .iter()
            .filter_map(|d| completed.get(*d).map(|s| ((*d).to_string(), *s)))
            .collect();
        drop(completed);
        statuses
    }

    /// Record a step as complete and wake all waiting threads.
    fn mark_complete(&self, name: &str, status: StepStatus) {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        completed.insert(name.to_string(), status);
        drop(completed);
        self.condvar.notify_all();
    }
}

/// Run every node of `plan` on its own thread, respecting dependencies.
///
/// OS threads are used rather than a work-stealing pool because each
/// thread blocks on the [`CompletionBoard`] until its dependencies finish.
pub(super) fn run_parallel(
    plan: &Plan,
    registry: &Registry,
    policy: FailurePolicy,
    log: &Arc<Logger>,
) -> Vec<StepEntry> {
    let board = CompletionBoard::new();
    let halted = AtomicBool::new(false);
    let results = Mutex::new(Vec::with_capacity(plan.len()));

    std::thread::scope(|s| {
        for name in plan.graph.names() {
            let deps = plan.graph.dependencies(name);
            let board = &board;
            let halted = &halted;
            let results = &results;
            s.spawn(move || {
                let finished = board.wait_for(&deps);
                let reason = plan.skip_reason(name, halted.load(Ordering::SeqCst), |d| {
                    finished.get(d).copied()
                });
                let entry = if let Some(reason) = reason {
                    skip(name, &reason, log.as_ref())
                } else {
                    log.notify_step_start(name);
                    let buf = BufferedLog::new(Arc::clone(log));
                    let entry = plan.run_entry(name, registry, &buf as &dyn Log);
                    buf.flush_and_complete(name);
                    entry
                };
                if entry.status == StepStatus::Failed && policy == FailurePolicy::StopOnFirst {
                    halted.store(true, Ordering::SeqCst);
                }
                board.mark_complete(name, entry.status);
                results
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(entry);
            });
        }
    });

    results.into_inner().unwrap_or_else(PoisonError::into_inner)
}
