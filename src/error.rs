//! Domain-specific error types for the provisioning engine.
//!
//! Each compilation and execution stage returns its own [`thiserror`] enum.
//! Command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ProvisionError
//! ├── Parse(ParseError)  malformed DSL text
//! ├── Flatten(FlattenError)  unsupported group type, identifier collision
//! ├── Graph(GraphError)  dependency cycle, dangling dependency
//! ├── Registry(RegistryError)  unknown type/subtype, invalid parameters
//! ├── Engine(EngineError)  malformed transition
//! └── Manifest(ManifestError)  manifest loading and validation
//! ```
//!
//! Adapter failures are deliberately absent: they travel through the
//! [`Outcome`](crate::resources::Outcome) channel instead of `Err`.

use thiserror::Error;

/// Top-level error type for the provisioning engine.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The DSL source could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Group flattening failed.
    #[error("Flatten error: {0}")]
    Flatten(#[from] FlattenError),

    /// The dependency graph is invalid.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// The resource type or subtype could not be resolved.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The reconciliation state machine was malformed.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// A manifest could not be loaded or validated.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

/// Errors raised while lexing or parsing DSL text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Malformed input at a given source position (1-based).
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        /// Line of the offending token.
        line: usize,
        /// Column of the offending token.
        column: usize,
        /// What was found and what was expected.
        message: String,
    },
}

/// Errors raised while flattening groups into a flat node set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlattenError {
    /// A group keyword other than `root`, `sequential` or `parallel`.
    #[error("unsupported group type '{group_type}' for group '{group}'")]
    UnsupportedGroupType {
        /// Identifier of the offending group.
        group: String,
        /// The group keyword as written (lower-cased).
        group_type: String,
    },

    /// A flattened identifier collides with one already emitted.
    #[error("duplicate identifier '{0}' after flattening")]
    DuplicateIdentifier(String),

    /// A dependency attribute is not a list of strings.
    #[error("attribute '{attribute}' of '{node}' must be a list of identifiers")]
    InvalidDependencyList {
        /// Node carrying the attribute.
        node: String,
        /// Attribute name (`depends_on` or `depends_on_system`).
        attribute: String,
    },
}

/// Errors raised while building the dependency graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The graph contains a cycle; `from -> to` is one edge on it.
    #[error("dependency cycle detected through edge '{from}' -> '{to}'")]
    CyclicDependency {
        /// Dependency side of the edge.
        from: String,
        /// Dependent side of the edge.
        to: String,
    },

    /// A node depends on an identifier that is not declared.
    #[error("'{node}' depends on undeclared node '{dependency}'")]
    UnknownDependency {
        /// The dependent node.
        node: String,
        /// The missing identifier.
        dependency: String,
    },

    /// A dependency attribute could not be read.
    #[error(transparent)]
    Attribute(#[from] FlattenError),
}

/// Errors raised while resolving an operator from the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No adapter family is registered under this type.
    #[error("unknown resource type '{0}'")]
    UnknownResourceType(String),

    /// The adapter family does not provide this subtype.
    #[error("unknown subtype '{subtype}' for resource type '{resource_type}' (supported: {supported})")]
    UnknownResourceSubtype {
        /// Registered resource type.
        resource_type: String,
        /// Requested subtype.
        subtype: String,
        /// Comma-separated subtypes the family does provide.
        supported: String,
    },

    /// Connector or capability parameters failed validation.
    #[error("invalid parameters for '{resource_type}/{subtype}': {reason}")]
    InvalidParameters {
        /// Resource type.
        resource_type: String,
        /// Resource subtype.
        subtype: String,
        /// Validation failure detail.
        reason: String,
    },
}

/// Errors raised by the reconciliation interpreter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A composite transition produced no sub-transition at all.
    #[error("transition '{0}' has no steps to execute")]
    EmptyTransition(String),
}

/// Errors raised while loading or validating manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// A manifest document must contain exactly one root key.
    #[error("manifest must contain exactly one root entry, found {0}")]
    RootEntryCount(usize),

    /// The requested target state is not recognised.
    #[error("invalid state '{0}': expected created, deleted, exists, absent or recreated")]
    InvalidState(String),

    /// `module.type` is missing or empty.
    #[error("module type must not be empty for '{0}'")]
    MissingModuleType(String),

    /// `wait_time` is negative, not finite or beyond the range of a `Duration`.
    #[error("invalid wait_time {value} for '{name}'")]
    InvalidWaitTime {
        /// Step name.
        name: String,
        /// Rejected value.
        value: f64,
    },

    /// A field has the wrong shape.
    #[error("invalid field '{field}' for '{name}': {reason}")]
    InvalidField {
        /// Step name.
        name: String,
        /// Field name.
        field: String,
        /// What was wrong.
        reason: String,
    },

    /// An `--include` or `--exclude` pattern is not a valid wildcard.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as given.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two manifests declare the same resource name.
    #[error("resource '{0}' is declared more than once")]
    DuplicateName(String),

    /// The document is not valid TOML for the manifest schema.
    #[error("invalid manifest {path}: {message}")]
    Syntax {
        /// Source of the document.
        path: String,
        /// Deserializer message.
        message: String,
    },

    /// An I/O error occurred while reading a manifest.
    #[error("IO error reading manifest {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn syntax_error_display_includes_position() {
        let e = ParseError::Syntax {
            line: 3,
            column: 7,
            message: "expected '=' but found '{'".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "syntax error at 3:7: expected '=' but found '{'"
        );
    }

    #[test]
    fn unsupported_group_type_display() {
        let e = FlattenError::UnsupportedGroupType {
            group: "g".to_string(),
            group_type: "random".to_string(),
        };
        assert_eq!(e.to_string(), "unsupported group type 'random' for group 'g'");
    }

    #[test]
    fn cyclic_dependency_names_edge() {
        let e = GraphError::CyclicDependency {
            from: "a".to_string(),
            to: "b".to_string(),
        };
        assert!(e.to_string().contains("'a' -> 'b'"));
    }

    #[test]
    fn unknown_subtype_display() {
        let e = RegistryError::UnknownResourceSubtype {
            resource_type: "fs".to_string(),
            subtype: "socket".to_string(),
            supported: "file, dir".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "unknown subtype 'socket' for resource type 'fs' (supported: file, dir)"
        );
    }

    #[test]
    fn empty_transition_display() {
        let e = EngineError::EmptyTransition("created".to_string());
        assert_eq!(e.to_string(), "transition 'created' has no steps to execute");
    }

    #[test]
    fn manifest_io_has_source() {
        use std::error::Error as StdError;
        let e = ManifestError::Io {
            path: "steps/a.toml".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("steps/a.toml"));
    }

    #[test]
    fn provision_error_from_sub_errors() {
        let e: ProvisionError = RegistryError::UnknownResourceType("s3".to_string()).into();
        assert!(e.to_string().starts_with("Registry error"));

        let e: ProvisionError = EngineError::EmptyTransition("x".to_string()).into();
        assert!(e.to_string().starts_with("Engine error"));

        let e: ProvisionError = ManifestError::RootEntryCount(2).into();
        assert!(e.to_string().contains("exactly one root entry"));
    }

    #[test]
    fn graph_error_wraps_attribute_error_transparently() {
        let inner = FlattenError::InvalidDependencyList {
            node: "a".to_string(),
            attribute: "depends_on".to_string(),
        };
        let e: GraphError = inner.clone().into();
        assert_eq!(e.to_string(), inner.to_string());
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<ProvisionError>();
        assert_send_sync::<ParseError>();
        assert_send_sync::<FlattenError>();
        assert_send_sync::<GraphError>();
        assert_send_sync::<RegistryError>();
        assert_send_sync::<EngineError>();
        assert_send_sync::<ManifestError>();
    }

    #[test]
    fn errors_convert_to_anyhow() {
        let _a: anyhow::Error = ParseError::Syntax {
            line: 1,
            column: 1,
            message: "x".to_string(),
        }
        .into();
        let _b: anyhow::Error = GraphError::UnknownDependency {
            node: "a".to_string(),
            dependency: "b".to_string(),
        }
        .into();
    }
}
