//! Resource manifests: one TOML document per resource.
//!
//! ```toml
//! [bucket]
//! description = "scratch area"
//! state = "created"
//! wait_time = 0.5
//! depends_on = ["network"]
//!
//! [bucket.connector]
//! root = "/srv/data"
//!
//! [bucket.module]
//! type = "fs"
//! subtype = "dir"
//!
//! [bucket.module.params]
//! path = "scratch"
//! ```
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::toml_loader;
use crate::engine::TargetState;
use crate::error::ManifestError;

/// Subtype used when a module does not name one.
pub const DEFAULT_SUBTYPE: &str = "default";

/// Adapter selection and capability parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSpec {
    /// Adapter family name, e.g. `fs`.
    #[serde(rename = "type", default)]
    pub module_type: String,
    /// Operator within the family.
    #[serde(default = "default_subtype")]
    pub subtype: String,
    /// Capability parameters, validated by the operator factory.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl ModuleSpec {
    /// Module of `module_type` with the default subtype and no parameters.
    #[must_use]
    pub fn new(module_type: impl Into<String>) -> Self {
        Self {
            module_type: module_type.into(),
            subtype: default_subtype(),
            params: Map::new(),
        }
    }
}

fn default_subtype() -> String {
    DEFAULT_SUBTYPE.to_string()
}

/// Manifest table body; the name comes from the root key.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepBody {
    #[serde(default)]
    description: String,
    #[serde(default)]
    state: Option<String>,
    module: ModuleSpec,
    #[serde(default)]
    connector: Map<String, Value>,
    #[serde(default)]
    wait_time: Option<f64>,
    #[serde(default)]
    depends_on: Vec<String>,
}

/// One resource and the state it should be driven to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepData {
    /// Resource name (the manifest's root key).
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Requested target state.
    pub state: TargetState,
    /// Adapter selection and parameters.
    pub module: ModuleSpec,
    /// Backend connection parameters.
    pub connector: Map<String, Value>,
    /// Settle delay in seconds; `None` uses the operator default.
    pub wait_time: Option<f64>,
    /// Resources that must be reconciled first.
    pub depends_on: Vec<String>,
}

impl StepData {
    /// A step with default fields for `module`.
    #[must_use]
    pub fn new(name: impl Into<String>, module: ModuleSpec) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            state: TargetState::default(),
            module,
            connector: Map::new(),
            wait_time: None,
            depends_on: Vec::new(),
        }
    }

    /// Parse a manifest document.
    ///
    /// `origin` names the source in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Syntax`] for malformed TOML,
    /// [`ManifestError::RootEntryCount`] unless exactly one root table is
    /// present, and any [`validate`](Self::validate) error.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ManifestError> {
        let document: toml::Table = toml_loader::parse_config(content, origin)?;
        Self::from_document(document, origin)
    }

    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read, otherwise
    /// the same errors as [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let document: toml::Table = toml_loader::load_config(path)?;
        Self::from_document(document, &path.display().to_string())
    }

    fn from_document(document: toml::Table, origin: &str) -> Result<Self, ManifestError> {
        if document.len() != 1 {
            return Err(ManifestError::RootEntryCount(document.len()));
        }
        let Some((name, value)) = document.into_iter().next() else {
            return Err(ManifestError::RootEntryCount(0));
        };
        let body: StepBody = value.try_into().map_err(|e: toml::de::Error| {
            ManifestError::Syntax {
                path: origin.to_string(),
                message: e.message().to_string(),
            }
        })?;
        let state = body
            .state
            .as_deref()
            .map(str::parse::<TargetState>)
            .transpose()?
            .unwrap_or_default();
        let step = Self {
            name,
            description: body.description,
            state,
            module: body.module,
            connector: body.connector,
            wait_time: body.wait_time,
            depends_on: body.depends_on,
        };
        step.validate()?;
        Ok(step)
    }

    /// Check the invariants the deserializer cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidField`] for an empty name or a
    /// self-dependency, [`ManifestError::MissingModuleType`] for an empty
    /// module type, and [`ManifestError::InvalidWaitTime`] for a wait that is negative,
    /// non-finite or too large for a [`Duration`].
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::InvalidField {
                name: self.name.clone(),
                field: "name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.module.module_type.trim().is_empty() {
            return Err(ManifestError::MissingModuleType(self.name.clone()));
        }
        if let Some(value) = self.wait_time
            && Duration::try_from_secs_f64(value).is_err()
        {
            return Err(ManifestError::InvalidWaitTime {
                name: self.name.clone(),
                value,
            });
        }
        if self.depends_on.iter().any(|d| d == &self.name) {
            return Err(ManifestError::InvalidField {
                name: self.name.clone(),
                field: "depends_on".to_string(),
                reason: "a resource cannot depend on itself".to_string(),
            });
        }
        Ok(())
    }

    /// Copy of this step with a different target state.
    #[must_use]
    pub fn with_state(&self, state: TargetState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Settle delay, falling back to `default` when unset.
    #[must_use]
    pub fn wait(&self, default: Duration) -> Duration {
        self.wait_time
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(default)
    }

    /// Message reported when the resource did not converge.
    #[must_use]
    pub fn failure_message(&self, detail: &str) -> String {
        format!("{} must be {} but: {detail}", self.name, self.state)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::test_helpers::write_temp_toml;
    use serde_json::json;

    const FILE_MANIFEST: &str = r#"
[greeting]
description = "hello file"
state = "created"
wait_time = 0.25
depends_on = ["workdir"]

[greeting.connector]
root = "/tmp/provision"

[greeting.module]
type = "fs"
subtype = "file"

[greeting.module.params]
path = "hello.txt"
content = "hi"
"#;

    // ---- parsing ----

    #[test]
    fn parses_full_manifest() {
        let step = StepData::from_toml_str(FILE_MANIFEST, "inline").unwrap();
        assert_eq!(step.name, "greeting");
        assert_eq!(step.description, "hello file");
        assert_eq!(step.state, TargetState::Created);
        assert_eq!(step.module.module_type, "fs");
        assert_eq!(step.module.subtype, "file");
        assert_eq!(
            Value::Object(step.module.params.clone()),
            json!({"path": "hello.txt", "content": "hi"})
        );
        assert_eq!(Value::Object(step.connector.clone()), json!({"root": "/tmp/provision"}));
        assert_eq!(step.wait_time, Some(0.25));
        assert_eq!(step.depends_on, vec!["workdir"]);
    }

    #[test]
    fn module_defaults_apply() {
        let step = StepData::from_toml_str("[r.module]\ntype = \"mock_true\"\n", "inline").unwrap();
        assert_eq!(step.state, TargetState::Created);
        assert_eq!(step.module.subtype, DEFAULT_SUBTYPE);
        assert!(step.module.params.is_empty());
        assert!(step.connector.is_empty());
        assert_eq!(step.wait_time, None);
    }

    #[test]
    fn from_file_reads_manifest() {
        let (_dir, path) = write_temp_toml(FILE_MANIFEST);
        let step = StepData::from_file(&path).unwrap();
        assert_eq!(step.name, "greeting");
    }

    // ---- validation ----

    #[test]
    fn rejects_multiple_root_entries() {
        let src = "[a.module]\ntype = \"noop\"\n\n[b.module]\ntype = \"noop\"\n";
        let err = StepData::from_toml_str(src, "inline").unwrap_err();
        assert!(matches!(err, ManifestError::RootEntryCount(2)));
    }

    #[test]
    fn rejects_empty_document() {
        let err = StepData::from_toml_str("", "inline").unwrap_err();
        assert!(matches!(err, ManifestError::RootEntryCount(0)));
    }

    #[test]
    fn rejects_unknown_state() {
        let src = "[a]\nstate = \"present\"\n[a.module]\ntype = \"noop\"\n";
        let err = StepData::from_toml_str(src, "inline").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidState(s) if s == "present"));
    }

    #[test]
    fn rejects_missing_module_type() {
        let src = "[a.module]\nsubtype = \"file\"\n";
        let err = StepData::from_toml_str(src, "inline").unwrap_err();
        assert!(matches!(err, ManifestError::MissingModuleType(n) if n == "a"));
    }

    #[test]
    fn rejects_negative_wait_time() {
        let src = "[a]\nwait_time = -1.0\n[a.module]\ntype = \"noop\"\n";
        let err = StepData::from_toml_str(src, "inline").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidWaitTime { .. }));
    }

    #[test]
    fn rejects_wait_time_beyond_duration_range() {
        let src = "[a]\nwait_time = 1e300\n[a.module]\ntype = \"noop\"\n";
        let err = StepData::from_toml_str(src, "inline").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidWaitTime { value, .. } if value > 1e299));
    }

    #[test]
    fn rejects_unknown_fields() {
        let src = "[a]\ncolour = \"red\"\n[a.module]\ntype = \"noop\"\n";
        let err = StepData::from_toml_str(src, "steps/a.toml").unwrap_err();
        assert!(matches!(err, ManifestError::Syntax { path, .. } if path == "steps/a.toml"));
    }

    #[test]
    fn rejects_self_dependency() {
        let mut step = StepData::new("a", ModuleSpec::new("noop"));
        step.depends_on.push("a".to_string());
        assert!(matches!(
            step.validate(),
            Err(ManifestError::InvalidField { field, .. }) if field == "depends_on"
        ));
    }

    // ---- helpers ----

    #[test]
    fn with_state_leaves_original_untouched() {
        let step = StepData::new("a", ModuleSpec::new("noop"));
        let deleted = step.with_state(TargetState::Deleted);
        assert_eq!(step.state, TargetState::Created);
        assert_eq!(deleted.state, TargetState::Deleted);
        assert_eq!(deleted.name, "a");
    }

    #[test]
    fn wait_prefers_explicit_value() {
        let mut step = StepData::new("a", ModuleSpec::new("noop"));
        let fallback = Duration::from_secs(3);
        assert_eq!(step.wait(fallback), fallback);
        step.wait_time = Some(0.5);
        assert_eq!(step.wait(fallback), Duration::from_millis(500));
    }

    #[test]
    fn failure_message_names_state() {
        let step = StepData::new("bucket", ModuleSpec::new("noop")).with_state(TargetState::Absent);
        assert_eq!(step.failure_message("found"), "bucket must be absent but: found");
    }
}
