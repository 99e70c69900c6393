//! Command: reconcile a single resource manifest.
use anyhow::Result;

use super::finish;
use crate::cli::ResourceVerb;
use crate::config::StepData;
use crate::logging::{Log as _, Logger};
use crate::plan::apply_step;
use crate::resources::registry::Registry;

/// Load the manifest named by `verb` with the verb's state applied.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or is invalid.
pub fn load(verb: &ResourceVerb) -> Result<StepData> {
    let step = StepData::from_file(&verb.opts().file)?;
    Ok(match verb.state_override() {
        Some(state) => step.with_state(state),
        None => step,
    })
}

/// Run a resource verb.
///
/// # Errors
///
/// Returns an error if the manifest is invalid or the resource does not
/// reach the requested state.
pub fn run(verb: &ResourceVerb, log: &Logger) -> Result<()> {
    let step = load(verb)?;
    log.stage(&format!("{} -> {}", step.name, step.state));
    if !step.description.is_empty() {
        log.info(&step.description);
    }
    apply_step(&step, &Registry::builtin(), log);
    finish(log)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::cli::ResourceOpts;
    use crate::config::test_helpers::write_file;
    use crate::engine::TargetState;
    use crate::logging::isolated_logger;

    fn file_manifest(root: &str) -> String {
        format!(
            "[note]\ndescription = \"scratch note\"\nstate = \"exists\"\n\n\
             [note.connector]\nroot = \"{root}\"\n\n\
             [note.module]\ntype = \"fs\"\nsubtype = \"file\"\n\n\
             [note.module.params]\npath = \"note.txt\"\ncontent = \"hello\"\n"
        )
    }

    #[test]
    fn load_applies_verb_state() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "note.toml", &file_manifest("."));
        let opts = ResourceOpts { file };
        assert_eq!(
            load(&ResourceVerb::Apply(opts.clone())).unwrap().state,
            TargetState::Exists
        );
        assert_eq!(
            load(&ResourceVerb::Recreate(opts)).unwrap().state,
            TargetState::Recreated
        );
    }

    #[test]
    fn create_then_delete_round_trip() {
        let (log, _tmp, _guard) = isolated_logger();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string().replace('\\', "/");
        let file = write_file(dir.path(), "note.toml", &file_manifest(&root));
        let opts = ResourceOpts { file };

        run(&ResourceVerb::Create(opts.clone()), &log).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("note.txt")).unwrap(),
            "hello"
        );

        run(&ResourceVerb::Delete(opts), &log).unwrap();
        assert!(!dir.path().join("note.txt").exists());
    }

    #[test]
    fn apply_fails_when_check_fails() {
        let (log, _tmp, _guard) = isolated_logger();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string().replace('\\', "/");
        let file = write_file(dir.path(), "note.toml", &file_manifest(&root));

        let err = run(&ResourceVerb::Apply(ResourceOpts { file }), &log).unwrap_err();
        assert_eq!(err.to_string(), "1 resource(s) failed");
        let entries = log.step_entries();
        assert!(
            entries[0]
                .message
                .as_deref()
                .unwrap()
                .starts_with("note must be exists but:")
        );
    }
}
