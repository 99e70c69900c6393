//! Command: print the dependency graph of a DSL file, or write it as a
//! standalone HTML viewer.
use std::fs;

use anyhow::{Context as _, Result};

use super::read_source;
use crate::cli::GraphOpts;
use crate::dsl::{flatten, parse};
use crate::graph::DependencyGraph;
use crate::logging::{Log as _, Logger};

/// HTML page drawing the graph embedded at [`GRAPH_PLACEHOLDER`].
const VIEWER_TEMPLATE: &str = include_str!("dag_viewer.html");

/// Marker in [`VIEWER_TEMPLATE`] replaced by the node-link JSON.
pub const GRAPH_PLACEHOLDER: &str = "{{ graph_json }}";

fn compile(source: &str, all_edges: bool) -> Result<DependencyGraph> {
    let flat = flatten(&parse(source)?)?;
    let graph = if all_edges {
        DependencyGraph::execution(&flat)?
    } else {
        DependencyGraph::visualization(&flat)?
    };
    Ok(graph)
}

/// Render DSL source as node-link JSON.
///
/// Only system edges are drawn unless `all_edges` is set.
///
/// # Errors
///
/// Returns an error if the source does not compile.
pub fn render(source: &str, all_edges: bool) -> Result<String> {
    let graph = compile(source, all_edges)?;
    Ok(serde_json::to_string_pretty(&graph.to_node_link())?)
}

/// Render DSL source as a self-contained HTML page.
///
/// # Errors
///
/// Returns an error if the source does not compile.
pub fn render_html(source: &str, all_edges: bool) -> Result<String> {
    let graph = compile(source, all_edges)?;
    // Type names are arbitrary strings and may contain `</script>`.
    let json = serde_json::to_string(&graph.to_node_link())?.replace("</", "<\\/");
    Ok(VIEWER_TEMPLATE.replace(GRAPH_PLACEHOLDER, &json))
}

/// Run the graph command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or compiled.
#[allow(clippy::print_stdout)]
pub fn run(opts: &GraphOpts, log: &Logger) -> Result<()> {
    let source = read_source(&opts.file)?;
    let edges = if opts.all_edges { "all" } else { "system" };
    if let Some(path) = &opts.html {
        let page = render_html(&source, opts.all_edges)?;
        fs::write(path, page).with_context(|| format!("writing {}", path.display()))?;
        log.info(&format!("wrote {} ({edges} edges)", path.display()));
    } else {
        let json = render(&source, opts.all_edges)?;
        log.debug(&format!("rendered {} ({edges} edges)", opts.file.display()));
        println!("{json}");
    }
    Ok(())
}
