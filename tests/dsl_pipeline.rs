#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the DSL pipeline: source text through parsing,
//! flattening, graph construction and reconciliation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use provision_cli::commands::apply::compile;
use provision_cli::commands::graph::render;
use provision_cli::dsl::{flatten, parse};
use provision_cli::engine::{self, RecordingTrace, TargetState, TraceEvent};
use provision_cli::graph::DependencyGraph;
use provision_cli::logging::{Logger, StepStatus};
use provision_cli::plan::{FailurePolicy, PlanEntry, RunOptions};
use provision_cli::resources::registry::Registry;

use common::*;

// ---------------------------------------------------------------------------
// End-to-end reconciliation
// ---------------------------------------------------------------------------

/// Leaf calls and their results, in call order.
fn leaf_calls(trace: &RecordingTrace) -> Vec<(String, bool)> {
    trace
        .events()
        .into_iter()
        .filter_map(|e| match e {
            TraceEvent::Step { call, ok, .. } if call != "created" => Some((call, ok)),
            _ => None,
        })
        .collect()
}

/// A resource that is missing at first is created and then confirmed.
#[test]
fn missing_resource_is_created_and_confirmed() {
    let plan = compile("myres: Resource[\"mock_true\"] = {}\n").unwrap();
    let step = plan
        .entry("myres")
        .and_then(|entry| match entry {
            PlanEntry::Reconcile(step) => Some(step),
            PlanEntry::Inert { .. } => None,
        })
        .expect("myres is a resource");
    assert_eq!(step.state, TargetState::Created);

    let registry = late_registry();
    let operator = registry
        .build(
            &step.module.module_type,
            &step.module.subtype,
            &step.connector,
            &step.module.params,
        )
        .unwrap();
    let trace = RecordingTrace::new();
    let outcome =
        engine::reconcile(operator.as_ref(), step.state, Duration::ZERO, &trace).unwrap();

    assert_eq!(
        leaf_calls(&trace),
        vec![
            ("exists".to_string(), false),
            ("create".to_string(), true),
            ("exists".to_string(), true),
        ]
    );
    assert!(outcome.ok);
}

/// The same program runs through a whole plan with a custom registry.
#[test]
fn plan_uses_registered_family() {
    let log = Arc::new(Logger::new("dsl-pipeline"));
    let plan = compile("myres: Resource[\"mock_true\"] = {}\n").unwrap();
    let report = plan.execute(&late_registry(), RunOptions::default(), &log);
    assert_eq!(report.status("myres"), Some(StepStatus::Ok));
    assert!(report.is_success());
}

/// Files declared in a sequential group are created on disk.
#[test]
fn sequential_group_writes_files() {
    let log = Arc::new(Logger::new("dsl-pipeline"));
    let work = tempfile::tempdir().unwrap();
    let root = portable(work.path());
    let src = format!(
        "site Sequential {{\n\
         @{{subtype = \"dir\", connector = {{root = \"{root}\"}}}}\n\
         public: Resource[\"fs\"] = {{path = \"public\"}}\n\
         @{{subtype = \"file\", connector = {{root = \"{root}\"}}}}\n\
         index: Resource[\"fs\"] = {{path = \"public/index.html\", content = \"<h1>hi</h1>\"}}\n\
         }}\n"
    );
    let plan = compile(&src).unwrap();
    let options = RunOptions {
        parallel: true,
        failure_policy: FailurePolicy::StopOnFirst,
    };
    let report = plan.execute(&Registry::builtin(), options, &log);

    assert!(report.is_success());
    assert_eq!(
        std::fs::read_to_string(work.path().join("public/index.html")).unwrap(),
        "<h1>hi</h1>"
    );

    let absent = plan.with_state(TargetState::Absent);
    let report = absent.execute(&Registry::builtin(), options, &log);
    assert_eq!(report.status("site_start"), Some(StepStatus::Ok));
    assert_eq!(report.status("public"), Some(StepStatus::Failed));
    assert_eq!(report.status("index"), Some(StepStatus::Skipped));
    assert_eq!(report.status("site"), Some(StepStatus::Skipped));
}

// ---------------------------------------------------------------------------
// Graph properties
// ---------------------------------------------------------------------------

const NESTED: &str = r#"
region = "eu-west-1"

stack Sequential {
    network: Resource["noop"] = {}
    workers Parallel {
        a: Resource["mock_true"] = {}
        b: Resource["mock_true"] = {}
    }
    @{depends_on = ["region"]}
    report: Resource["noop"] = {}
}
"#;

fn execution_graph(src: &str) -> DependencyGraph {
    DependencyGraph::execution(&flatten(&parse(src).unwrap()).unwrap()).unwrap()
}

/// Every edge points forward in the topological order.
#[test]
fn topological_order_respects_every_edge() {
    let graph = execution_graph(NESTED);
    let order = graph.topological_order();
    assert_eq!(order.len(), graph.len());
    let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
    for (from, to) in graph.edges() {
        assert!(position(from) < position(to), "{from} -> {to}");
    }
}

/// Parallel members share one layer between the group boundaries.
#[test]
fn parallel_members_share_a_layer() {
    let graph = execution_graph(NESTED);
    let layers = graph.layers();
    let layer_of = |name: &str| layers.iter().position(|l| l.contains(&name)).unwrap();
    assert_eq!(layer_of("a"), layer_of("b"));
    assert!(layer_of("workers_start") < layer_of("a"));
    assert!(layer_of("workers") > layer_of("b"));
    assert!(layer_of("stack") > layer_of("report"));
}

/// Empty groups still produce a start node feeding the end node.
#[test]
fn empty_groups_have_boundary_edge() {
    for keyword in ["Sequential", "Parallel"] {
        let graph = execution_graph(&format!("g {keyword} {{ }}"));
        assert_eq!(graph.dependencies("g"), vec!["g_start"]);
        assert!(graph.dependencies("g_start").is_empty());
    }
}

/// The visualization graph drops author-declared edges only.
#[test]
fn visualization_omits_author_edges() {
    let flat = flatten(&parse(NESTED).unwrap()).unwrap();
    let exec = DependencyGraph::execution(&flat).unwrap();
    let vis = DependencyGraph::visualization(&flat).unwrap();
    assert!(exec.dependencies("report").contains(&"region"));
    assert!(!vis.dependencies("report").contains(&"region"));
    assert_eq!(exec.edges().count(), vis.edges().count() + 1);
}

/// Node-link output lists nodes in declaration order.
#[test]
fn rendered_graph_lists_flattened_nodes() {
    let json: serde_json::Value = serde_json::from_str(&render(NESTED, true).unwrap()).unwrap();
    let ids: Vec<&str> = json["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            "region",
            "stack_start",
            "network",
            "workers_start",
            "a",
            "b",
            "workers",
            "report",
            "stack"
        ]
    );
}

/// A cycle through author edges is rejected before anything runs.
#[test]
fn cycle_is_rejected_at_compile_time() {
    let src = "@{depends_on = [\"b\"]}\na: Resource[\"noop\"] = {}\n\
               @{depends_on = [\"a\"]}\nb: Resource[\"noop\"] = {}\n";
    let err = compile(src).unwrap_err();
    assert!(err.to_string().contains("dependency cycle detected"));
}
