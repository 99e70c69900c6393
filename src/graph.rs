//! Dependency graph over flattened nodes.
//!
//! An edge `a → b` means "`a` reconciles before `b`".  The graph is validated
//! acyclic on construction; cycles are reported with one offending edge.
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::dsl::{DEPENDS_ON, DEPENDS_ON_SYSTEM, FlatNodeSet};
use crate::error::GraphError;

/// Display labels carried by each vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeLabel {
    /// Node kind (`resource`, `variable`, …).
    pub kind: String,
    /// Node or module type.
    #[serde(rename = "type")]
    pub node_type: String,
}

/// A validated directed acyclic graph.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    labels: IndexMap<String, NodeLabel>,
    /// `dependencies[i]` = indices that must complete before `i`.
    dependencies: Vec<Vec<usize>>,
    /// `dependents[i]` = indices that wait on `i`.
    dependents: Vec<Vec<usize>>,
}

/// Build a graph from a flat node set.
///
/// Edges come from `depends_on` and/or `depends_on_system`, as selected.
///
/// # Errors
///
/// Returns [`GraphError::UnknownDependency`] when a dependency names an
/// undeclared node, [`GraphError::CyclicDependency`] when the edges form a
/// cycle, or [`GraphError::Attribute`] when a dependency attribute is not a
/// list of identifiers.
pub fn build_dag(
    flat: &FlatNodeSet,
    use_depends_on: bool,
    use_depends_on_system: bool,
) -> Result<DependencyGraph, GraphError> {
    let mut entries = Vec::with_capacity(flat.len());
    for (name, node) in flat {
        let mut deps = Vec::new();
        if use_depends_on {
            deps.extend(node.dependency_list(name, DEPENDS_ON)?);
        }
        if use_depends_on_system {
            deps.extend(node.dependency_list(name, DEPENDS_ON_SYSTEM)?);
        }
        let label = NodeLabel {
            kind: node.kind.clone(),
            node_type: node.node_type.clone(),
        };
        entries.push((name.clone(), label, deps));
    }
    DependencyGraph::from_dependencies(entries)
}

impl DependencyGraph {
    /// Graph used for execution: author and system edges.
    ///
    /// # Errors
    ///
    /// See [`build_dag`].
    pub fn execution(flat: &FlatNodeSet) -> Result<Self, GraphError> {
        build_dag(flat, true, true)
    }

    /// Graph used for display: system edges only.
    ///
    /// # Errors
    ///
    /// See [`build_dag`].
    pub fn visualization(flat: &FlatNodeSet) -> Result<Self, GraphError> {
        build_dag(flat, false, true)
    }

    /// Build from `(name, label, dependencies)` triples in declaration order.
    ///
    /// Repeated dependencies collapse into one edge.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownDependency`] or
    /// [`GraphError::CyclicDependency`].
    pub fn from_dependencies<I>(entries: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (String, NodeLabel, Vec<String>)>,
    {
        let mut labels = IndexMap::new();
        let mut declared = Vec::new();
        for (name, label, deps) in entries {
            labels.insert(name.clone(), label);
            declared.push((name, deps));
        }

        let n = labels.len();
        let mut dependencies: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (name, deps) in declared {
            let Some(to) = labels.get_index_of(&name) else {
                continue;
            };
            for dep in deps {
                let from = labels.get_index_of(&dep).ok_or_else(|| {
                    GraphError::UnknownDependency {
                        node: name.clone(),
                        dependency: dep.clone(),
                    }
                })?;
                if let Some(list) = dependencies.get_mut(to)
                    && !list.contains(&from)
                {
                    list.push(from);
                    if let Some(rev) = dependents.get_mut(from) {
                        rev.push(to);
                    }
                }
            }
        }

        let graph = Self {
            labels,
            dependencies,
            dependents,
        };
        if let Some((from, to)) = graph.find_cycle_edge() {
            return Err(GraphError::CyclicDependency {
                from: graph.name(from).to_string(),
                to: graph.name(to).to_string(),
            });
        }
        Ok(graph)
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the graph has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Whether `name` is a vertex.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    /// Vertex names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    /// Labels of `name`, if it is a vertex.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&NodeLabel> {
        self.labels.get(name)
    }

    /// Direct predecessors of `name`.
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, &self.dependencies)
    }

    /// Direct successors of `name`.
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, &self.dependents)
    }

    /// All edges as `(dependency, dependent)`, grouped by dependent in
    /// declaration order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies.iter().enumerate().flat_map(move |(to, froms)| {
            froms.iter().map(move |&from| (self.name(from), self.name(to)))
        })
    }

    /// A topological order; among ready vertices the earliest declared wins.
    #[must_use]
    pub fn topological_order(&self) -> Vec<&str> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter_map(|(i, &d)| (d == 0).then_some(Reverse(i)))
            .collect();
        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(self.name(idx));
            for &next in self.dependents.get(idx).map_or(&[][..], Vec::as_slice) {
                if let Some(count) = in_degree.get_mut(next) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse(next));
                    }
                }
            }
        }
        order
    }

    /// Vertices grouped into layers; every vertex's dependencies lie in
    /// earlier layers.
    #[must_use]
    pub fn layers(&self) -> Vec<Vec<&str>> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut current: Vec<usize> = in_degree
            .iter()
            .enumerate()
            .filter_map(|(i, &d)| (d == 0).then_some(i))
            .collect();
        let mut layers = Vec::new();
        while !current.is_empty() {
            let mut next = Vec::new();
            for &idx in &current {
                for &dep in self.dependents.get(idx).map_or(&[][..], Vec::as_slice) {
                    if let Some(count) = in_degree.get_mut(dep) {
                        *count -= 1;
                        if *count == 0 {
                            next.push(dep);
                        }
                    }
                }
            }
            next.sort_unstable();
            layers.push(current.iter().map(|&i| self.name(i)).collect());
            current = next;
        }
        layers
    }

    /// Node-link document for external viewers.
    #[must_use]
    pub fn to_node_link(&self) -> NodeLink<'_> {
        NodeLink {
            directed: true,
            multigraph: false,
            graph: Map::new(),
            nodes: self
                .labels
                .iter()
                .map(|(id, label)| NodeLinkNode { id, label })
                .collect(),
            edges: self
                .edges()
                .map(|(source, target)| NodeLinkEdge { source, target })
                .collect(),
        }
    }

    fn name(&self, idx: usize) -> &str {
        self.labels
            .get_index(idx)
            .map_or("", |(name, _)| name.as_str())
    }

    fn neighbours<'a>(&'a self, name: &str, adjacency: &'a [Vec<usize>]) -> Vec<&'a str> {
        self.labels
            .get_index_of(name)
            .and_then(|i| adjacency.get(i))
            .map(|list| list.iter().map(|&j| self.name(j)).collect())
            .unwrap_or_default()
    }

    /// Depth-first search for a back edge; returns `(dependency, dependent)`.
    fn find_cycle_edge(&self) -> Option<(usize, usize)> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.len()];
        for root in 0..self.len() {
            if marks.get(root) != Some(&Mark::New) {
                continue;
            }
            // Explicit stack of (vertex, next successor position).
            let mut stack = vec![(root, 0usize)];
            if let Some(m) = marks.get_mut(root) {
                *m = Mark::Active;
            }
            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let succ = self.dependents.get(node).and_then(|s| s.get(top.1)).copied();
                top.1 += 1;
                match succ {
                    Some(next) => match marks.get(next) {
                        Some(Mark::Active) => return Some((node, next)),
                        Some(Mark::New) => {
                            if let Some(m) = marks.get_mut(next) {
                                *m = Mark::Active;
                            }
                            stack.push((next, 0));
                        }
                        _ => {}
                    },
                    None => {
                        if let Some(m) = marks.get_mut(node) {
                            *m = Mark::Done;
                        }
                        stack.pop();
                    }
                }
            }
        }
        None
    }
}

/// Serializable node-link view of a [`DependencyGraph`].
#[derive(Debug, Serialize)]
pub struct NodeLink<'a> {
    /// Always `true`.
    pub directed: bool,
    /// Always `false`.
    pub multigraph: bool,
    /// Graph-level attributes (empty).
    pub graph: Map<String, Value>,
    /// Vertices in declaration order.
    pub nodes: Vec<NodeLinkNode<'a>>,
    /// Edges from dependency to dependent.
    pub edges: Vec<NodeLinkEdge<'a>>,
}

/// One vertex of a [`NodeLink`].
#[derive(Debug, Serialize)]
pub struct NodeLinkNode<'a> {
    /// Vertex identifier.
    pub id: &'a str,
    /// Kind and type.
    #[serde(flatten)]
    pub label: &'a NodeLabel,
}

/// One edge of a [`NodeLink`].
#[derive(Debug, Serialize)]
pub struct NodeLinkEdge<'a> {
    /// Dependency.
    pub source: &'a str,
    /// Dependent.
    pub target: &'a str,
}
