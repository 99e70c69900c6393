// Shared helpers for integration tests.
//
// Provides temporary workspaces, manifest builders and a scripted adapter
// family whose `exists` answers follow a fixed sequence, so each test can
// observe exactly which capabilities the engine called.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use serde_json::{Map, Value};

use provision_cli::resources::registry::{AdapterFamily, OperatorFactory, Registry};
use provision_cli::resources::{Operator, Outcome};

/// Write `content` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(&path, content).expect("write file");
    path
}

/// `path` rendered with forward slashes for embedding in DSL or TOML text.
pub fn portable(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// TOML manifest for an `fs` resource rooted at `root`.
pub fn fs_manifest(
    name: &str,
    subtype: &str,
    root: &Path,
    params: &str,
    depends_on: &[&str],
) -> String {
    let deps: Vec<String> = depends_on.iter().map(|d| format!("\"{d}\"")).collect();
    format!(
        "[{name}]\ndepends_on = [{deps}]\n\n\
         [{name}.connector]\nroot = \"{root}\"\n\n\
         [{name}.module]\ntype = \"fs\"\nsubtype = \"{subtype}\"\n\n\
         [{name}.module.params]\n{params}\n",
        deps = deps.join(", "),
        root = portable(root),
    )
}

/// Operator whose first `exists` check fails; later checks and `create` succeed.
#[derive(Debug, Default)]
pub struct LateOperator {
    exists_calls: AtomicUsize,
}

impl Operator for LateOperator {
    fn description(&self) -> String {
        "late appearing resource".to_string()
    }

    fn create(&self) -> Result<Outcome> {
        Ok(Outcome::success())
    }

    fn exists(&self) -> Result<Outcome> {
        let call = self.exists_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= 2 {
            Ok(Outcome::success())
        } else {
            Ok(Outcome::failure(""))
        }
    }
}

/// Adapter family standing in for `mock_true` with [`LateOperator`].
#[derive(Debug)]
pub struct LateFamily;

fn build_late(
    _connector: &Map<String, Value>,
    _params: &Map<String, Value>,
) -> serde_json::Result<Box<dyn Operator>> {
    Ok(Box::new(LateOperator::default()))
}

impl AdapterFamily for LateFamily {
    fn name(&self) -> &'static str {
        "mock_true"
    }

    fn subtypes(&self) -> &'static [&'static str] {
        &["default"]
    }

    fn get_operator(&self, subtype: &str) -> Option<OperatorFactory> {
        (subtype == "default").then_some(build_late as OperatorFactory)
    }
}

/// Built-in registry with `mock_true` replaced by [`LateFamily`].
pub fn late_registry() -> Registry {
    let mut registry = Registry::builtin();
    registry.register(Box::new(LateFamily));
    registry
}
