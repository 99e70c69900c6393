//! Command: reconcile every manifest under a directory.
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::{finish, version};
use crate::cli::{GlobalOpts, ManifestOpts};
use crate::config::scan::{self, ScanFilter};
use crate::logging::{Log as _, Logger};
use crate::plan::Plan;
use crate::resources::registry::Registry;

/// Run the manifest command.
///
/// # Errors
///
/// Returns an error if the directory cannot be scanned, a manifest is
/// invalid, the dependencies do not form a DAG, or any resource fails.
pub fn run(global: &GlobalOpts, opts: &ManifestOpts, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("provision {}", version::current()));

    log.stage("Loading manifests");
    let filter = ScanFilter::new(&opts.include, &opts.exclude)?;
    let steps = scan::load_dir_filtered(&opts.dir, &filter)
        .with_context(|| format!("loading manifests from {}", opts.dir.display()))?;
    log.info(&format!(
        "loaded {} manifest(s) from {}",
        steps.len(),
        opts.dir.display()
    ));
    for step in &steps {
        log.debug(&format!(
            "{}: {}/{} -> {}",
            step.name, step.module.module_type, step.module.subtype, step.state
        ));
    }

    let mut plan = Plan::from_steps(steps)?;
    if let Some(state) = opts.state {
        log.info(&format!("target state: {state}"));
        plan = plan.with_state(state);
    }

    log.stage("Reconciling");
    plan.execute(&Registry::builtin(), global.run_options(), log);

    finish(log)
}
