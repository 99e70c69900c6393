//! The provisioning DSL: lexing, parsing, and group flattening.
//!
//! ```text
//! source text ──parse──▶ NodeTree ──flatten──▶ FlatNodeSet ──▶ graph
//! ```
//!
//! A [`Node`] is either a leaf carrying a literal [`Value`] or a group
//! carrying an ordered body of child nodes.  Attribute maps stay dynamic
//! because backend parameter shapes are arbitrary.
pub mod flatten;
mod lexer;
pub mod parser;

pub use flatten::flatten;
pub use parser::parse;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered identifier → node mapping for one scope.
pub type NodeTree = IndexMap<String, Node>;

/// Ordered identifier → leaf node mapping produced by [`flatten`].
pub type FlatNodeSet = IndexMap<String, Node>;

/// Attribute key holding author-declared dependencies.
pub const DEPENDS_ON: &str = "depends_on";

/// Attribute key holding dependencies synthesized by group flattening.
pub const DEPENDS_ON_SYSTEM: &str = "depends_on_system";

/// Node kind of every group.
pub const GROUP_KIND: &str = "group";

/// Node kind of reconcilable resources.
pub const RESOURCE_KIND: &str = "resource";

/// Resource type of synthetic group boundary nodes.
pub const NOOP_TYPE: &str = "noop";

/// Payload of a node: a literal for leaves, child nodes for groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeContent {
    /// Literal value of a leaf declaration.
    Value(Value),
    /// Ordered children of a group.
    Body(NodeTree),
}

/// A parsed DSL declaration.
///
/// # Examples
///
/// ```
/// use provision_cli::dsl::Node;
///
/// let leaf = Node::leaf("resource", "mock_true", serde_json::json!({}));
/// assert!(leaf.value().is_some());
/// assert!(leaf.body().is_none());
/// assert!(!leaf.is_group());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// Lower-cased kind tag (`resource`, `variable`, `group`, …).
    pub kind: String,
    /// Lower-cased type (`aws_s3_bucket`, `sequential`, `default`, …).
    #[serde(rename = "type")]
    pub node_type: String,
    /// Metadata, including dependency lists.
    pub attr: Map<String, Value>,
    /// Leaf value or group body.
    #[serde(flatten)]
    pub content: NodeContent,
}

impl Node {
    /// Create a leaf node with empty attributes.
    #[must_use]
    pub fn leaf(kind: &str, node_type: &str, value: Value) -> Self {
        Self {
            kind: kind.to_string(),
            node_type: node_type.to_string(),
            attr: Map::new(),
            content: NodeContent::Value(value),
        }
    }

    /// Create a group node with empty attributes.
    #[must_use]
    pub fn group(group_type: &str, body: NodeTree) -> Self {
        Self {
            kind: GROUP_KIND.to_string(),
            node_type: group_type.to_string(),
            attr: Map::new(),
            content: NodeContent::Body(body),
        }
    }

    /// Synthetic boundary node emitted for group start and end markers.
    #[must_use]
    pub fn noop() -> Self {
        Self::leaf(RESOURCE_KIND, NOOP_TYPE, Value::Object(Map::new()))
    }

    /// Replace the attribute map.
    #[must_use]
    pub fn with_attr(mut self, attr: Map<String, Value>) -> Self {
        self.attr = attr;
        self
    }

    /// The literal value, or `None` for groups.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match &self.content {
            NodeContent::Value(v) => Some(v),
            NodeContent::Body(_) => None,
        }
    }

    /// The child nodes, or `None` for leaves.
    #[must_use]
    pub const fn body(&self) -> Option<&NodeTree> {
        match &self.content {
            NodeContent::Body(b) => Some(b),
            NodeContent::Value(_) => None,
        }
    }

    /// Whether this node is a group.
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self.content, NodeContent::Body(_))
    }

    /// Whether this node is a reconcilable resource.
    #[must_use]
    pub fn is_resource(&self) -> bool {
        self.kind == RESOURCE_KIND
    }

    /// Read a dependency list attribute (`depends_on` / `depends_on_system`).
    ///
    /// A missing attribute is an empty list; a single string is accepted as
    /// a one-element list.
    ///
    /// # Errors
    ///
    /// Returns [`FlattenError::InvalidDependencyList`](crate::error::FlattenError::InvalidDependencyList)
    /// if the attribute is neither a string nor a list of strings.
    pub fn dependency_list(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Vec<String>, crate::error::FlattenError> {
        let invalid = || crate::error::FlattenError::InvalidDependencyList {
            node: name.to_string(),
            attribute: key.to_string(),
        };
        match self.attr.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
                .collect(),
            Some(_) => Err(invalid()),
        }
    }
}
