//! Adapter registry: maps a resource `type` to its adapter family and a
//! `subtype` to an operator factory.
//!
//! ```text
//! Registry::get_cls("fs") ──▶ &dyn AdapterFamily
//!                               └─ get_operator("file") ──▶ OperatorFactory
//!                                                           └─ (connector, params) ──▶ Box<dyn Operator>
//! ```
use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{Operator, fs, mock};
use crate::error::RegistryError;

/// Builds an operator from connector parameters and capability parameters.
///
/// Factories validate both maps into typed structs; a deserializer error is
/// reported as [`RegistryError::InvalidParameters`] by [`Registry::build`].
pub type OperatorFactory =
    fn(&Map<String, Value>, &Map<String, Value>) -> serde_json::Result<Box<dyn Operator>>;

/// A family of operators sharing one resource `type`.
pub trait AdapterFamily: Send + Sync + fmt::Debug {
    /// Resource type this family is registered under.
    fn name(&self) -> &'static str;

    /// Supported subtypes, listed when an unknown one is requested.
    fn subtypes(&self) -> &'static [&'static str];

    /// Factory for `subtype`, or `None` if unsupported.
    fn get_operator(&self, subtype: &str) -> Option<OperatorFactory>;
}

/// Registration table of adapter families.
#[derive(Debug, Default)]
pub struct Registry {
    families: IndexMap<&'static str, Box<dyn AdapterFamily>>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every built-in family.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(mock::NoopFamily));
        registry.register(Box::new(mock::MockTrueFamily));
        registry.register(Box::new(mock::MockFalseFamily));
        registry.register(Box::new(fs::FsFamily));
        registry
    }

    /// Add or replace a family under its own name.
    pub fn register(&mut self, family: Box<dyn AdapterFamily>) {
        self.families.insert(family.name(), family);
    }

    /// Family registered for `resource_type`.
    #[must_use]
    pub fn get_cls(&self, resource_type: &str) -> Option<&dyn AdapterFamily> {
        self.families.get(resource_type).map(Box::as_ref)
    }

    /// Registered type names in registration order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.families.keys().copied()
    }

    /// Look up the factory for `(resource_type, subtype)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownResourceType`] or
    /// [`RegistryError::UnknownResourceSubtype`].
    pub fn resolve(
        &self,
        resource_type: &str,
        subtype: &str,
    ) -> Result<OperatorFactory, RegistryError> {
        let family = self
            .get_cls(resource_type)
            .ok_or_else(|| RegistryError::UnknownResourceType(resource_type.to_string()))?;
        family
            .get_operator(subtype)
            .ok_or_else(|| RegistryError::UnknownResourceSubtype {
                resource_type: resource_type.to_string(),
                subtype: subtype.to_string(),
                supported: family.subtypes().join(", "),
            })
    }

    /// Resolve and instantiate an operator in one step.
    ///
    /// # Errors
    ///
    /// Returns any [`resolve`](Self::resolve) error, or
    /// [`RegistryError::InvalidParameters`] if the factory rejects its input.
    pub fn build(
        &self,
        resource_type: &str,
        subtype: &str,
        connector: &Map<String, Value>,
        params: &Map<String, Value>,
    ) -> Result<Box<dyn Operator>, RegistryError> {
        let factory = self.resolve(resource_type, subtype)?;
        factory(connector, params).map_err(|e| RegistryError::InvalidParameters {
            resource_type: resource_type.to_string(),
            subtype: subtype.to_string(),
            reason: e.to_string(),
        })
    }
}
