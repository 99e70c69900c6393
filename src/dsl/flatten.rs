//! Group flattening: nested `Sequential` / `Parallel` groups become a flat set
//! of leaf nodes with synthesized ordering edges in `depends_on_system`.
//!
//! A group `k` is replaced by two `noop` resources: `k_start` (entry) and `k`
//! (exit).  Sequential groups chain their children between the two; parallel
//! groups fan out from `k_start` and fan back in at `k`.
use serde_json::Value;

use super::{DEPENDS_ON, DEPENDS_ON_SYSTEM, FlatNodeSet, Node, NodeTree};
use crate::error::FlattenError;

/// Type of the implicit top-level group.
pub const ROOT_GROUP: &str = "root";
/// Children run one after another in declaration order.
pub const SEQUENTIAL_GROUP: &str = "sequential";
/// Children run independently between a shared start and end.
pub const PARALLEL_GROUP: &str = "parallel";

/// Flatten a parsed tree into an ordered set of leaf nodes.
///
/// Every emitted node carries a `depends_on_system` list.  Top-level leaves
/// get an empty list.
///
/// # Examples
///
/// ```
/// use provision_cli::dsl::{flatten, parse};
///
/// let tree = parse("g Sequential { a: Resource[\"noop\"] = {} }").unwrap();
/// let flat = flatten(&tree).unwrap();
/// let names: Vec<&str> = flat.keys().map(String::as_str).collect();
/// assert_eq!(names, ["g_start", "a", "g"]);
/// ```
///
/// # Errors
///
/// Returns [`FlattenError::UnsupportedGroupType`] for group keywords other
/// than `sequential` and `parallel`, and
/// [`FlattenError::DuplicateIdentifier`] if a synthesized or preserved name
/// collides with one already emitted.
pub fn flatten(tree: &NodeTree) -> Result<FlatNodeSet, FlattenError> {
    let mut out = FlatNodeSet::new();
    for (name, node) in tree {
        flatten_node(name, node, &[], &mut out)?;
    }
    Ok(out)
}

/// Name of the entry node emitted for group `name`.
#[must_use]
pub fn start_name(name: &str) -> String {
    format!("{name}_start")
}

/// Flatten one node whose entry must wait on `entry_deps`; returns its exit
/// node name.
fn flatten_node(
    name: &str,
    node: &Node,
    entry_deps: &[String],
    out: &mut FlatNodeSet,
) -> Result<String, FlattenError> {
    let Some(body) = node.body() else {
        let mut leaf = node.clone();
        append_system_deps(name, &mut leaf, entry_deps)?;
        emit(name, leaf, out)?;
        return Ok(name.to_string());
    };

    let group_type = node.node_type.as_str();
    if group_type != SEQUENTIAL_GROUP && group_type != PARALLEL_GROUP {
        return Err(FlattenError::UnsupportedGroupType {
            group: name.to_string(),
            group_type: group_type.to_string(),
        });
    }

    let start = start_name(name);
    let (mut start_node, mut end_node) = boundary_nodes(node);
    append_system_deps(&start, &mut start_node, entry_deps)?;
    emit(&start, start_node, out)?;

    let end_deps = if group_type == SEQUENTIAL_GROUP {
        let mut prev = start.clone();
        for (child_name, child) in body {
            prev = flatten_node(child_name, child, std::slice::from_ref(&prev), out)?;
        }
        vec![prev]
    } else {
        let fan_out = [start.clone()];
        let mut exits = Vec::with_capacity(body.len());
        for (child_name, child) in body {
            exits.push(flatten_node(child_name, child, &fan_out, out)?);
        }
        if exits.is_empty() { vec![start] } else { exits }
    };

    append_system_deps(name, &mut end_node, &end_deps)?;
    emit(name, end_node, out)?;
    Ok(name.to_string())
}

/// Split a group's annotation across its boundary nodes: `depends_on` gates
/// the start node, everything else describes the end node.
fn boundary_nodes(group: &Node) -> (Node, Node) {
    let mut start = Node::noop();
    let mut end = Node::noop();
    for (key, value) in &group.attr {
        if key == DEPENDS_ON {
            start.attr.insert(key.clone(), value.clone());
        } else if key != DEPENDS_ON_SYSTEM {
            end.attr.insert(key.clone(), value.clone());
        }
    }
    (start, end)
}

fn append_system_deps(name: &str, node: &mut Node, deps: &[String]) -> Result<(), FlattenError> {
    let mut list = node.dependency_list(name, DEPENDS_ON_SYSTEM)?;
    list.extend(deps.iter().cloned());
    node.attr.insert(
        DEPENDS_ON_SYSTEM.to_string(),
        Value::Array(list.into_iter().map(Value::String).collect()),
    );
    Ok(())
}

fn emit(name: &str, node: Node, out: &mut FlatNodeSet) -> Result<(), FlattenError> {
    if out.contains_key(name) {
        return Err(FlattenError::DuplicateIdentifier(name.to_string()));
    }
    out.insert(name.to_string(), node);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::dsl::{NOOP_TYPE, RESOURCE_KIND, parse};
    use serde_json::json;

    fn flat(src: &str) -> FlatNodeSet {
        flatten(&parse(src).expect("parse")).expect("flatten")
    }

    fn system_deps(set: &FlatNodeSet, name: &str) -> Vec<String> {
        set[name].dependency_list(name, DEPENDS_ON_SYSTEM).unwrap()
    }

    fn names(set: &FlatNodeSet) -> Vec<&str> {
        set.keys().map(String::as_str).collect()
    }

    // -----------------------------------------------------------------------
    // Root level
    // -----------------------------------------------------------------------

    #[test]
    fn top_level_leaves_get_empty_system_deps() {
        let set = flat("a = 1\nb: Resource[\"noop\"] = {}");
        assert_eq!(names(&set), vec!["a", "b"]);
        assert!(system_deps(&set, "a").is_empty());
        assert_eq!(set["b"].attr[DEPENDS_ON_SYSTEM], json!([]));
    }

    #[test]
    fn author_depends_on_is_preserved() {
        let set = flat("@{ depends_on = [\"b\"] }\na = 1\nb = 2");
        assert_eq!(set["a"].attr[DEPENDS_ON], json!(["b"]));
    }

    // -----------------------------------------------------------------------
    // Sequential
    // -----------------------------------------------------------------------

    #[test]
    fn empty_sequential_group() {
        let set = flat("g Sequential { }");
        assert_eq!(names(&set), vec!["g_start", "g"]);
        assert_eq!(system_deps(&set, "g"), vec!["g_start"]);
        assert!(system_deps(&set, "g_start").is_empty());
    }

    #[test]
    fn sequential_chain() {
        let set = flat(
            r#"g Sequential {
                a: Resource["noop"] = {}
                b: Resource["noop"] = {}
                c: Resource["noop"] = {}
            }"#,
        );
        assert_eq!(names(&set), vec!["g_start", "a", "b", "c", "g"]);
        assert_eq!(system_deps(&set, "a"), vec!["g_start"]);
        assert_eq!(system_deps(&set, "b"), vec!["a"]);
        assert_eq!(system_deps(&set, "c"), vec!["b"]);
        assert_eq!(system_deps(&set, "g"), vec!["c"]);
    }

    #[test]
    fn boundary_nodes_are_noop_resources() {
        let set = flat("g Sequential { }");
        for name in ["g_start", "g"] {
            assert_eq!(set[name].kind, RESOURCE_KIND);
            assert_eq!(set[name].node_type, NOOP_TYPE);
            assert_eq!(set[name].value(), Some(&json!({})));
        }
    }

    // -----------------------------------------------------------------------
    // Parallel
    // -----------------------------------------------------------------------

    #[test]
    fn empty_parallel_group() {
        let set = flat("g Parallel { }");
        assert_eq!(names(&set), vec!["g_start", "g"]);
        assert_eq!(system_deps(&set, "g"), vec!["g_start"]);
    }

    #[test]
    fn parallel_fans_out_and_in() {
        let set = flat(
            r#"p Parallel {
                a: Resource["noop"] = {}
                b: Resource["noop"] = {}
            }"#,
        );
        assert_eq!(system_deps(&set, "a"), vec!["p_start"]);
        assert_eq!(system_deps(&set, "b"), vec!["p_start"]);
        assert_eq!(system_deps(&set, "p"), vec!["a", "b"]);
    }

    // -----------------------------------------------------------------------
    // Nesting
    // -----------------------------------------------------------------------

    #[test]
    fn nested_group_entry_and_exit() {
        let set = flat(
            r#"outer Sequential {
                first: Resource["noop"] = {}
                inner Parallel {
                    x: Resource["noop"] = {}
                    y: Resource["noop"] = {}
                }
                last: Resource["noop"] = {}
            }"#,
        );
        assert_eq!(
            names(&set),
            vec!["outer_start", "first", "inner_start", "x", "y", "inner", "last", "outer"]
        );
        assert_eq!(system_deps(&set, "inner_start"), vec!["first"]);
        assert_eq!(system_deps(&set, "x"), vec!["inner_start"]);
        assert_eq!(system_deps(&set, "inner"), vec!["x", "y"]);
        assert_eq!(system_deps(&set, "last"), vec!["inner"]);
        assert_eq!(system_deps(&set, "outer"), vec!["last"]);
    }

    #[test]
    fn group_annotation_is_split_across_boundaries() {
        let set = flat(
            r#"before = 1
            @{ depends_on = ["before"], description = "jobs" }
            g Sequential { }"#,
        );
        assert_eq!(set["g_start"].attr[DEPENDS_ON], json!(["before"]));
        assert!(!set["g_start"].attr.contains_key("description"));
        assert_eq!(set["g"].attr["description"], "jobs");
        assert!(!set["g"].attr.contains_key(DEPENDS_ON));
    }

    // -----------------------------------------------------------------------
    // Errors
    // -----------------------------------------------------------------------

    #[test]
    fn unsupported_group_type() {
        let err = flatten(&parse("g Random { }").unwrap()).unwrap_err();
        assert_eq!(
            err,
            FlattenError::UnsupportedGroupType {
                group: "g".to_string(),
                group_type: "random".to_string()
            }
        );
    }

    #[test]
    fn nested_root_group_is_unsupported() {
        let err = flatten(&parse("g Sequential { r Root { } }").unwrap()).unwrap_err();
        assert!(matches!(err, FlattenError::UnsupportedGroupType { .. }));
    }

    #[test]
    fn synthetic_name_collision_is_rejected() {
        let err = flatten(&parse("g_start = 1\ng Sequential { }").unwrap()).unwrap_err();
        assert_eq!(err, FlattenError::DuplicateIdentifier("g_start".to_string()));
    }

    #[test]
    fn identifier_reused_across_groups_is_rejected() {
        let err = flatten(&parse("a = 1\ng Parallel { a = 2 }").unwrap()).unwrap_err();
        assert_eq!(err, FlattenError::DuplicateIdentifier("a".to_string()));
    }
}
