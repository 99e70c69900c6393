//! Local filesystem adapter family (`fs`) with `file` and `dir` subtypes.
//!
//! Every path is relative to the connector's `root` directory; absolute
//! paths and parent-directory components are rejected at build time.
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::registry::{AdapterFamily, OperatorFactory};
use super::{Operator, Outcome, typed_params};

/// Connector parameters shared by both subtypes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FsConnector {
    /// Directory every resource path is resolved against.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// A path guaranteed to stay below the connector root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct RelativePath(PathBuf);

impl TryFrom<String> for RelativePath {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw.is_empty() {
            return Err("path must not be empty".to_string());
        }
        let path = PathBuf::from(&raw);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(format!("path '{raw}' must be relative and stay below root"));
        }
        Ok(Self(path))
    }
}

/// Parameters of the `file` subtype.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileParams {
    /// File path below root.
    pub path: RelativePath,
    /// Content written on creation.
    #[serde(default)]
    pub content: String,
}

/// Parameters of the `dir` subtype.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirParams {
    /// Directory path below root.
    pub path: RelativePath,
}

/// A regular file with fixed initial content.
#[derive(Debug, Clone)]
pub struct FileOperator {
    path: PathBuf,
    content: String,
}

impl FileOperator {
    /// Bind to `root/params.path`.
    #[must_use]
    pub fn new(connector: &FsConnector, params: FileParams) -> Self {
        Self {
            path: connector.root.join(params.path.0),
            content: params.content,
        }
    }
}

impl Operator for FileOperator {
    fn description(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn create(&self) -> Result<Outcome> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .with_context(|| format!("creating file {}", self.path.display()))?;
        file.write_all(self.content.as_bytes())
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(Outcome::success())
    }

    fn delete(&self) -> Result<Outcome> {
        if self.path.is_dir() {
            std::fs::remove_dir_all(&self.path)
        } else {
            std::fs::remove_file(&self.path)
        }
        .with_context(|| format!("removing {}", self.path.display()))?;
        Ok(Outcome::success())
    }

    fn exists(&self) -> Result<Outcome> {
        Ok(if self.path.is_file() {
            Outcome::success()
        } else if self.path.exists() {
            Outcome::failure(format!("not a file: {}", self.path.display()))
        } else {
            Outcome::failure(format!("not found: {}", self.path.display()))
        })
    }

    fn absent(&self) -> Result<Outcome> {
        Ok(absent(&self.path))
    }
}

/// A directory.
#[derive(Debug, Clone)]
pub struct DirOperator {
    path: PathBuf,
}

impl DirOperator {
    /// Bind to `root/params.path`.
    #[must_use]
    pub fn new(connector: &FsConnector, params: DirParams) -> Self {
        Self {
            path: connector.root.join(params.path.0),
        }
    }
}

impl Operator for DirOperator {
    fn description(&self) -> String {
        format!("directory {}", self.path.display())
    }

    fn create(&self) -> Result<Outcome> {
        std::fs::create_dir_all(&self.path)
            .with_context(|| format!("creating directory {}", self.path.display()))?;
        Ok(Outcome::success())
    }

    /// Only empty directories are removed.
    fn delete(&self) -> Result<Outcome> {
        std::fs::remove_dir(&self.path)
            .with_context(|| format!("removing directory {}", self.path.display()))?;
        Ok(Outcome::success())
    }

    fn exists(&self) -> Result<Outcome> {
        Ok(if self.path.is_dir() {
            Outcome::success()
        } else if self.path.exists() {
            Outcome::failure(format!("not a directory: {}", self.path.display()))
        } else {
            Outcome::failure(format!("not found: {}", self.path.display()))
        })
    }

    fn absent(&self) -> Result<Outcome> {
        Ok(absent(&self.path))
    }
}

fn absent(path: &Path) -> Outcome {
    // symlink_metadata so a dangling link still counts as present
    if std::fs::symlink_metadata(path).is_ok() {
        Outcome::failure(format!("exists: {}", path.display()))
    } else {
        Outcome::success()
    }
}

fn build_file(
    connector: &Map<String, Value>,
    params: &Map<String, Value>,
) -> serde_json::Result<Box<dyn Operator>> {
    let connector: FsConnector = typed_params(connector)?;
    let params: FileParams = typed_params(params)?;
    Ok(Box::new(FileOperator::new(&connector, params)))
}

fn build_dir(
    connector: &Map<String, Value>,
    params: &Map<String, Value>,
) -> serde_json::Result<Box<dyn Operator>> {
    let connector: FsConnector = typed_params(connector)?;
    let params: DirParams = typed_params(params)?;
    Ok(Box::new(DirOperator::new(&connector, params)))
}

/// The `fs` family.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFamily;

impl AdapterFamily for FsFamily {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn subtypes(&self) -> &'static [&'static str] {
        &["file", "dir"]
    }

    fn get_operator(&self, subtype: &str) -> Option<OperatorFactory> {
        match subtype {
            "file" => Some(build_file as OperatorFactory),
            "dir" => Some(build_dir as OperatorFactory),
            _ => None,
        }
    }
}
