//! Command: compile a DSL file and reconcile its resources.
use std::sync::Arc;

use anyhow::Result;

use super::{finish, read_source, version};
use crate::cli::{ApplyOpts, GlobalOpts};
use crate::dsl::{flatten, parse};
use crate::error::ProvisionError;
use crate::logging::{Log as _, Logger};
use crate::plan::Plan;
use crate::resources::registry::Registry;

/// Compile DSL source into an execution plan.
///
/// # Errors
///
/// Returns the first parse, flatten, graph or attribute error.
pub fn compile(source: &str) -> Result<Plan, ProvisionError> {
    let tree = parse(source)?;
    let flat = flatten(&tree)?;
    Plan::from_nodes(&flat)
}

/// Run the apply command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or compiled, or if any
/// resource fails to converge.
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("provision {}", version::current()));

    log.stage("Compiling");
    let source = read_source(&opts.file)?;
    let mut plan = compile(&source)?;
    if let Some(state) = opts.state {
        log.info(&format!("target state: {state}"));
        plan = plan.with_state(state);
    }
    log.info(&format!(
        "{} node(s) from {}",
        plan.len(),
        opts.file.display()
    ));

    log.stage("Reconciling");
    plan.execute(&Registry::builtin(), global.run_options(), log);

    finish(log)
}
