//! TOML manifest file parsing.
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ManifestError;

/// Read and deserialize a TOML file.
///
/// # Type Parameters
///
/// - `T`: Target type to deserialize into (must implement `DeserializeOwned`)
///
/// # Errors
///
/// Returns [`ManifestError::Io`] if the file cannot be read, or
/// [`ManifestError::Syntax`] if it is not valid for `T`.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content, &path.display().to_string())
}

/// Deserialize TOML text; `origin` names the source in error messages.
///
/// # Errors
///
/// Returns [`ManifestError::Syntax`] if the text is not valid for `T`.
pub fn parse_config<T: DeserializeOwned>(content: &str, origin: &str) -> Result<T, ManifestError> {
    toml::from_str(content).map_err(|e| ManifestError::Syntax {
        path: origin.to_string(),
        message: e.message().to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::test_helpers::write_temp_toml;
    use std::collections::BTreeMap;

    #[test]
    fn load_config_reads_tables() {
        let (_dir, path) = write_temp_toml("[a]\nx = 1\n\n[b]\nx = 2\n");
        let map: BTreeMap<String, toml::Table> = load_config(&path).unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn load_config_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config::<toml::Table>(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn parse_config_reports_origin() {
        let err = parse_config::<toml::Table>("[a\n", "inline").unwrap_err();
        assert!(
            matches!(&err, ManifestError::Syntax { path, message } if path == "inline" && !message.is_empty()),
            "unexpected error: {err}"
        );
    }
}
