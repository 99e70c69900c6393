//! Top-level subcommand orchestration.
pub mod apply;
pub mod graph;
pub mod manifest;
pub mod resource;
pub mod version;

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::logging::Logger;

/// Read a source file, naming it in the error.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Print the summary and bail if any resource failed.
///
/// # Errors
///
/// Returns an error if one or more steps recorded a failure.
pub fn finish(log: &Logger) -> Result<()> {
    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} resource(s) failed");
    }
    Ok(())
}
