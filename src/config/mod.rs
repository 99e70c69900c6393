//! Manifest configuration: TOML loading, step validation and directory scans.
pub mod manifest;
pub mod scan;
pub mod toml_loader;

pub use manifest::{ModuleSpec, StepData};

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::path::{Path, PathBuf};

    /// Write `content` to `name` inside `dir`, creating parent directories.
    #[allow(clippy::expect_used)]
    pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, content).expect("write test file");
        path
    }

    /// Write a single TOML file into a fresh temporary directory.
    #[allow(clippy::expect_used)]
    pub fn write_temp_toml(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write_file(dir.path(), "manifest.toml", content);
        (dir, path)
    }
}
