//! Execution plans: every node of a dependency graph paired with the work it
//! stands for, reconciled in dependency order.
//!
//! A plan is built either from a flattened DSL node set or from loaded
//! manifests.  Execution walks the graph topologically; with
//! [`RunOptions::parallel`] independent resources run concurrently on the
//! [`scheduler`].
mod scheduler;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::config::manifest::{DEFAULT_SUBTYPE, ModuleSpec, StepData};
use crate::dsl::{FlatNodeSet, Node, RESOURCE_KIND};
use crate::engine::{self, LogTrace, TargetState};
use crate::error::{ManifestError, ProvisionError};
use crate::graph::{DependencyGraph, NodeLabel};
use crate::logging::{Log, Logger, StepEntry, StepStatus};
use crate::resources::registry::Registry;

/// What happens to the rest of a batch after a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep going; only dependents of the failed step are skipped.
    #[default]
    Continue,
    /// Skip every step that has not started yet.
    StopOnFirst,
}

/// Batch execution settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Run independent steps concurrently.
    pub parallel: bool,
    /// Behaviour after a failure.
    pub failure_policy: FailurePolicy,
}

/// Work attached to one graph node.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEntry {
    /// Reconcile a resource.
    Reconcile(StepData),
    /// A declaration with nothing to reconcile (variables, providers, …).
    Inert {
        /// Node kind, reported in the summary.
        kind: String,
    },
}

/// Results of one batch, in topological order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// One entry per plan node.
    pub steps: Vec<StepEntry>,
}

impl ExecutionReport {
    /// Status recorded for `name`.
    #[must_use]
    pub fn status(&self, name: &str) -> Option<StepStatus> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.status)
    }

    /// Number of failed steps.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count()
    }

    /// Whether nothing failed or was skipped.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.status, StepStatus::Ok | StepStatus::NotApplicable))
    }
}

/// A validated dependency graph with work for every node.
#[derive(Debug, Clone)]
pub struct Plan {
    graph: DependencyGraph,
    entries: IndexMap<String, PlanEntry>,
}

impl Plan {
    /// Plan for a flattened DSL node set using the execution graph.
    ///
    /// Resource nodes become [`PlanEntry::Reconcile`]; see [`step_from_node`]
    /// for the attribute mapping.
    ///
    /// # Errors
    ///
    /// Returns a graph error for cycles or unknown dependencies, or a
    /// manifest error when a resource node's attributes are malformed.
    pub fn from_nodes(flat: &FlatNodeSet) -> Result<Self, ProvisionError> {
        let graph = DependencyGraph::execution(flat)?;
        let mut entries = IndexMap::with_capacity(flat.len());
        for (name, node) in flat {
            let entry = if node.is_resource() {
                let deps = graph.dependencies(name).into_iter().map(String::from);
                PlanEntry::Reconcile(step_from_node(name, node, deps.collect())?)
            } else {
                PlanEntry::Inert {
                    kind: node.kind.clone(),
                }
            };
            entries.insert(name.clone(), entry);
        }
        Ok(Self { graph, entries })
    }

    /// Plan for manifest steps ordered by their `depends_on` lists.
    ///
    /// # Errors
    ///
    /// Returns a graph error for cycles or dependencies on resources that
    /// are not part of `steps`.
    pub fn from_steps(steps: Vec<StepData>) -> Result<Self, ProvisionError> {
        let graph = DependencyGraph::from_dependencies(steps.iter().map(|step| {
            let label = NodeLabel {
                kind: RESOURCE_KIND.to_string(),
                node_type: step.module.module_type.clone(),
            };
            (step.name.clone(), label, step.depends_on.clone())
        }))?;
        let entries = steps
            .into_iter()
            .map(|step| (step.name.clone(), PlanEntry::Reconcile(step)))
            .collect();
        Ok(Self { graph, entries })
    }

    /// Copy of this plan with every resource driven to `state`.
    #[must_use]
    pub fn with_state(&self, state: TargetState) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(name, entry)| {
                let entry = match entry {
                    PlanEntry::Reconcile(step) => PlanEntry::Reconcile(step.with_state(state)),
                    PlanEntry::Inert { .. } => entry.clone(),
                };
                (name.clone(), entry)
            })
            .collect();
        Self {
            graph: self.graph.clone(),
            entries,
        }
    }

    /// The underlying dependency graph.
    #[must_use]
    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Work attached to `name`.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&PlanEntry> {
        self.entries.get(name)
    }

    /// Number of plan nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the plan has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reconcile every node in dependency order.
    ///
    /// A step whose dependency failed or was skipped is itself skipped.
    /// Every result is recorded on `log` for the summary.
    pub fn execute(
        &self,
        registry: &Registry,
        options: RunOptions,
        log: &Arc<Logger>,
    ) -> ExecutionReport {
        log.debug(&format!(
            "executing {} node(s) ({})",
            self.len(),
            if options.parallel {
                "parallel"
            } else {
                "sequential"
            }
        ));
        let mut steps = if options.parallel {
            scheduler::run_parallel(self, registry, options.failure_policy, log)
        } else {
            self.run_sequential(registry, options.failure_policy, log.as_ref())
        };
        let order: HashMap<&str, usize> = self
            .graph
            .topological_order()
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();
        steps.sort_by_key(|s| order.get(s.name.as_str()).copied().unwrap_or(usize::MAX));
        ExecutionReport { steps }
    }

    fn run_sequential(
        &self,
        registry: &Registry,
        policy: FailurePolicy,
        log: &dyn Log,
    ) -> Vec<StepEntry> {
        let mut finished: HashMap<&str, StepStatus> = HashMap::new();
        let mut halted = false;
        let mut results = Vec::with_capacity(self.len());
        for name in self.graph.topological_order() {
            let entry = match self.skip_reason(name, halted, |d| finished.get(d).copied()) {
                Some(reason) => skip(name, &reason, log),
                None => self.run_entry(name, registry, log),
            };
            if entry.status == StepStatus::Failed && policy == FailurePolicy::StopOnFirst {
                halted = true;
            }
            finished.insert(name, entry.status);
            results.push(entry);
        }
        results
    }

    /// Why `name` must not run, given the status of finished nodes.
    fn skip_reason(
        &self,
        name: &str,
        halted: bool,
        status_of: impl Fn(&str) -> Option<StepStatus>,
    ) -> Option<String> {
        if halted {
            return Some("stopped after an earlier failure".to_string());
        }
        self.graph
            .dependencies(name)
            .into_iter()
            .find(|dep| status_of(*dep).is_some_and(StepStatus::blocks_dependents))
            .map(|dep| format!("dependency '{dep}' did not complete"))
    }

    fn run_entry(&self, name: &str, registry: &Registry, log: &dyn Log) -> StepEntry {
        match self.entries.get(name) {
            Some(PlanEntry::Reconcile(step)) => apply_step(step, registry, log),
            Some(PlanEntry::Inert { kind }) => {
                log.debug(&format!("{name}: {kind} (nothing to reconcile)"));
                record(log, name, StepStatus::NotApplicable, Some(kind.clone()))
            }
            None => skip(name, "not part of the plan", log),
        }
    }
}

fn skip(name: &str, reason: &str, log: &dyn Log) -> StepEntry {
    log.warn(&format!("{name}: skipped ({reason})"));
    record(log, name, StepStatus::Skipped, Some(reason.to_string()))
}

fn record(log: &dyn Log, name: &str, status: StepStatus, message: Option<String>) -> StepEntry {
    log.record_step(name, status, message.as_deref());
    StepEntry::new(name, status, message)
}

/// Resolve the operator for `step`, reconcile it, and record the result.
///
/// Registry and engine errors are reported as a failed step rather than
/// propagated so that the rest of a batch can proceed.
pub fn apply_step(step: &StepData, registry: &Registry, log: &dyn Log) -> StepEntry {
    let failed = |message: String| {
        log.error(&message);
        record(log, &step.name, StepStatus::Failed, Some(message))
    };

    let operator = match registry.build(
        &step.module.module_type,
        &step.module.subtype,
        &step.connector,
        &step.module.params,
    ) {
        Ok(operator) => operator,
        Err(e) => return failed(format!("{}: {e}", step.name)),
    };

    log.debug(&format!(
        "{}: {} -> {}",
        step.name,
        operator.description(),
        step.state
    ));
    let wait = step.wait(operator.default_wait_time());
    let trace = LogTrace::new(log, &step.name);
    match engine::reconcile(operator.as_ref(), step.state, wait, &trace) {
        Ok(outcome) if outcome.ok => {
            log.info(&format!("{} is {}", step.name, step.state));
            let message = (!outcome.message.is_empty()).then_some(outcome.message);
            record(log, &step.name, StepStatus::Ok, message)
        }
        Ok(outcome) => failed(step.failure_message(&outcome.message)),
        Err(e) => failed(format!("{}: {e}", step.name)),
    }
}

/// Derive a [`StepData`] from a resource node.
///
/// The node's `type` selects the adapter family and its literal value holds
/// the capability parameters.  Attributes `subtype`, `state`, `description`,
/// `connector` and `wait_time` override the defaults; `depends_on` is taken
/// from the graph.
///
/// # Errors
///
/// Returns [`ManifestError::InvalidField`] when an attribute or the value has
/// the wrong shape, [`ManifestError::InvalidState`] for an unknown state, or
/// any [`StepData::validate`] error.
pub fn step_from_node(
    name: &str,
    node: &Node,
    depends_on: Vec<String>,
) -> Result<StepData, ManifestError> {
    let invalid = |field: &str, reason: &str| ManifestError::InvalidField {
        name: name.to_string(),
        field: field.to_string(),
        reason: reason.to_string(),
    };
    let text = |key: &str| match node.attr.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(key, "expected a string")),
    };
    let object = |key: &str, value: Option<&Value>| match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(invalid(key, "expected an object")),
    };

    let state = text("state")?
        .as_deref()
        .map(str::parse::<TargetState>)
        .transpose()?
        .unwrap_or_default();
    let wait_time = match node.attr.get("wait_time") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(_) => return Err(invalid("wait_time", "expected a number of seconds")),
    };
    let step = StepData {
        name: name.to_string(),
        description: text("description")?.unwrap_or_default(),
        state,
        module: ModuleSpec {
            module_type: node.node_type.clone(),
            subtype: text("subtype")?.unwrap_or_else(|| DEFAULT_SUBTYPE.to_string()),
            params: object("value", node.value())?,
        },
        connector: object("connector", node.attr.get("connector"))?,
        wait_time,
        depends_on,
    };
    step.validate()?;
    Ok(step)
}
