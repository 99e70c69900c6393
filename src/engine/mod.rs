//! Reconciliation engine: converges one resource to a target state.
//!
//! A [`TargetState`] is compiled into a [`Transition`] program which is
//! interpreted recursively against an [`Operator`].  Capability errors never
//! abort the interpreter; they become failed [`Outcome`]s and are traced like
//! any other result.
pub mod trace;
pub mod transition;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use trace::{LogTrace, NoopTrace, RecordingTrace, TraceEvent, TraceSink, TraceStep};
pub use transition::{Step, StepPolicy, Transition};

use crate::error::{EngineError, ManifestError};
use crate::resources::{Operator, Outcome, invoke};

/// Desired end state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    /// The resource exists, creating it if needed.
    #[default]
    Created,
    /// The resource is absent, deleting it if needed.
    Deleted,
    /// Check only: the resource exists.
    Exists,
    /// Check only: the resource is absent.
    Absent,
    /// Delete then create.
    Recreated,
}

impl TargetState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Created,
        Self::Deleted,
        Self::Exists,
        Self::Absent,
        Self::Recreated,
    ];

    /// Lower-case state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
            Self::Exists => "exists",
            Self::Absent => "absent",
            Self::Recreated => "recreated",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetState {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ManifestError::InvalidState(s.to_string()))
    }
}

/// Converge `operator` to `state`.
///
/// `wait` is slept after each mutating call before the confirmatory check.
///
/// # Errors
///
/// Returns [`EngineError::EmptyTransition`] if the compiled program contains
/// an empty composite.
pub fn reconcile(
    operator: &dyn Operator,
    state: TargetState,
    wait: Duration,
    trace: &dyn TraceSink,
) -> Result<Outcome, EngineError> {
    run(&Transition::for_state(state), operator, wait, trace)
}

/// Interpret an arbitrary transition program.
///
/// # Errors
///
/// Returns [`EngineError::EmptyTransition`] when a composite has no steps.
pub fn run(
    transition: &Transition,
    operator: &dyn Operator,
    wait: Duration,
    trace: &dyn TraceSink,
) -> Result<Outcome, EngineError> {
    Interpreter {
        operator,
        wait,
        trace,
    }
    .evaluate(transition, 0)
}

struct Interpreter<'a> {
    operator: &'a dyn Operator,
    wait: Duration,
    trace: &'a dyn TraceSink,
}

impl Interpreter<'_> {
    fn evaluate(&self, transition: &Transition, depth: usize) -> Result<Outcome, EngineError> {
        match transition {
            Transition::Leaf(capability) => {
                let outcome = invoke(self.operator, *capability)
                    .unwrap_or_else(|e| Outcome::failure(format!("{e:#}")));
                self.report(depth, capability.as_str(), &outcome);
                Ok(outcome)
            }
            Transition::Composite { name, steps } => {
                self.trace.on_enter(depth, name);
                let mut last = None;
                for step in steps {
                    let outcome = self.evaluate(&step.transition, depth + 1)?;
                    let ok = outcome.ok;
                    last = Some(outcome);
                    match step.policy {
                        StepPolicy::StopOnSuccess if ok => break,
                        StepPolicy::Settle if !self.wait.is_zero() => {
                            std::thread::sleep(self.wait);
                        }
                        _ => {}
                    }
                }
                let outcome = last.ok_or_else(|| EngineError::EmptyTransition(name.clone()))?;
                self.report(depth, name, &outcome);
                Ok(outcome)
            }
        }
    }

    fn report(&self, depth: usize, call: &str, outcome: &Outcome) {
        self.trace.on_step(&TraceStep {
            depth,
            call,
            ok: outcome.ok,
            message: &outcome.message,
        });
    }
}
