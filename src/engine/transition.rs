//! Reconciliation programs as data.
//!
//! A [`Transition`] is either a single capability call or a named composite
//! of steps, each with a continuation policy.  The built-in target states
//! are expressed with the same vocabulary:
//!
//! ```text
//! created   = [exists ?stop, create ~settle, exists]
//! deleted   = [absent ?stop, delete ~settle, absent]
//! exists    = exists
//! absent    = absent
//! recreated = [deleted, created]
//! ```
use super::TargetState;
use crate::resources::Capability;

/// What the interpreter does after a step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Always evaluate the next step.
    Continue,
    /// Finish the composite if this step succeeded.
    StopOnSuccess,
    /// Sleep for the wait time, then evaluate the next step.
    Settle,
}

/// One entry of a composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Sub-transition to evaluate.
    pub transition: Transition,
    /// Continuation after evaluation.
    pub policy: StepPolicy,
}

impl Step {
    /// Step followed unconditionally by the next one.
    #[must_use]
    pub const fn then(transition: Transition) -> Self {
        Self {
            transition,
            policy: StepPolicy::Continue,
        }
    }

    /// Step that ends the composite when it succeeds.
    #[must_use]
    pub const fn stop_on_success(transition: Transition) -> Self {
        Self {
            transition,
            policy: StepPolicy::StopOnSuccess,
        }
    }

    /// Step followed by the settle delay.
    #[must_use]
    pub const fn settle(transition: Transition) -> Self {
        Self {
            transition,
            policy: StepPolicy::Settle,
        }
    }
}

/// A reconciliation program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Call one operator capability.
    Leaf(Capability),
    /// Evaluate steps in order; the outcome is that of the last one evaluated.
    Composite {
        /// Name reported to trace sinks.
        name: String,
        /// Steps, at least one.
        steps: Vec<Step>,
    },
}

impl Transition {
    /// Program converging a resource to `state`.
    #[must_use]
    pub fn for_state(state: TargetState) -> Self {
        match state {
            TargetState::Created => Self::converge(state, Capability::Exists, Capability::Create),
            TargetState::Deleted => Self::converge(state, Capability::Absent, Capability::Delete),
            TargetState::Exists => Self::Leaf(Capability::Exists),
            TargetState::Absent => Self::Leaf(Capability::Absent),
            TargetState::Recreated => Self::Composite {
                name: state.to_string(),
                steps: vec![
                    Step::then(Self::for_state(TargetState::Deleted)),
                    Step::then(Self::for_state(TargetState::Created)),
                ],
            },
        }
    }

    /// check, short-circuit on success, mutate, settle, re-check.
    fn converge(state: TargetState, check: Capability, mutate: Capability) -> Self {
        Self::Composite {
            name: state.to_string(),
            steps: vec![
                Step::stop_on_success(Self::Leaf(check)),
                Step::settle(Self::Leaf(mutate)),
                Step::then(Self::Leaf(check)),
            ],
        }
    }

    /// Name reported to trace sinks.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(cap) => cap.as_str(),
            Self::Composite { name, .. } => name,
        }
    }
}
