//! Manifest directory discovery and bulk loading.
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use rayon::prelude::*;

use super::manifest::StepData;
use crate::error::ManifestError;

/// Wildcard selecting manifests when no `--include` is given.
pub const DEFAULT_INCLUDE: &str = "*.toml";

/// Which files a scan yields.
///
/// Patterns are shell wildcards matched against the path relative to the
/// scan root, with `/` separators; `*` also crosses directories.  A file is
/// kept when it matches some include pattern and no exclude pattern.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
        }
        .with_default_include()
    }
}

impl ScanFilter {
    /// Compile `include` and `exclude`; an empty `include` means
    /// [`DEFAULT_INCLUDE`].
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidPattern`] for a malformed wildcard.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ManifestError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        }
        .with_default_include())
    }

    fn with_default_include(mut self) -> Self {
        if self.include.is_empty() {
            self.include.push(Pattern::new(DEFAULT_INCLUDE).unwrap_or_default());
        }
        self
    }

    /// Whether `relative` (a path under the scan root) is selected.
    #[must_use]
    pub fn accepts(&self, relative: &Path) -> bool {
        let path = relative.to_string_lossy().replace('\\', "/");
        self.include.iter().any(|p| p.matches(&path))
            && !self.exclude.iter().any(|p| p.matches(&path))
    }

    /// List selected files under `root` breadth-first.
    ///
    /// Files of one directory come before any of its subdirectories; both are
    /// visited in name order.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if a directory cannot be read.
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ManifestError> {
        let mut found = Vec::new();
        let mut queue = VecDeque::from([root.to_path_buf()]);
        while let Some(dir) = queue.pop_front() {
            let mut files = Vec::new();
            let mut dirs = Vec::new();
            for entry in fs::read_dir(&dir).map_err(io_error(&dir))? {
                let path = entry.map_err(io_error(&dir))?.path();
                if path.is_dir() {
                    dirs.push(path);
                } else if self.accepts(path.strip_prefix(root).unwrap_or(&path)) {
                    files.push(path);
                }
            }
            files.sort();
            dirs.sort();
            found.extend(files);
            queue.extend(dirs);
        }
        Ok(found)
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, ManifestError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| ManifestError::InvalidPattern {
                pattern: p.clone(),
                reason: e.msg.to_string(),
            })
        })
        .collect()
}

/// List `*.toml` manifests under `root` breadth-first.
///
/// # Errors
///
/// See [`ScanFilter::scan`].
pub fn scan(root: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    ScanFilter::default().scan(root)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ManifestError {
    let path = path.display().to_string();
    move |source| ManifestError::Io { path, source }
}

/// Load every manifest in `paths` in parallel, preserving input order.
///
/// # Errors
///
/// Returns a load error if any manifest fails, or
/// [`ManifestError::DuplicateName`] if two manifests declare the same
/// resource.
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<StepData>, ManifestError> {
    let steps = paths
        .par_iter()
        .map(|path| StepData::from_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    for step in &steps {
        if !seen.insert(step.name.as_str()) {
            return Err(ManifestError::DuplicateName(step.name.clone()));
        }
    }
    Ok(steps)
}

/// [`scan`] then [`load_all`].
///
/// # Errors
///
/// See [`scan`] and [`load_all`].
pub fn load_dir(root: &Path) -> Result<Vec<StepData>, ManifestError> {
    load_all(&scan(root)?)
}

/// [`ScanFilter::scan`] then [`load_all`].
///
/// # Errors
///
/// See [`ScanFilter::scan`] and [`load_all`].
pub fn load_dir_filtered(root: &Path, filter: &ScanFilter) -> Result<Vec<StepData>, ManifestError> {
    load_all(&filter.scan(root)?)
}
