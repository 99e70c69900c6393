//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::engine::TargetState;
use crate::plan::{FailurePolicy, RunOptions};

/// Top-level CLI entry point for the provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "provision",
    about = "Declarative resource provisioning engine",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared across all subcommands.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Copy, Default)]
pub struct GlobalOpts {
    /// Reconcile independent resources concurrently
    #[arg(long, global = true)]
    pub parallel: bool,

    /// Keep reconciling unrelated resources after a failure
    #[arg(short = 'k', long, global = true)]
    pub keep_going: bool,
}

impl GlobalOpts {
    /// Batch execution settings selected by these flags.
    #[must_use]
    pub const fn run_options(&self) -> RunOptions {
        RunOptions {
            parallel: self.parallel,
            failure_policy: if self.keep_going {
                FailurePolicy::Continue
            } else {
                FailurePolicy::StopOnFirst
            },
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a DSL file and reconcile every resource it declares
    Apply(ApplyOpts),
    /// Print the dependency graph of a DSL file as node-link JSON
    Graph(GraphOpts),
    /// Reconcile every manifest found under a directory
    Manifest(ManifestOpts),
    /// Reconcile a single resource manifest
    Resource {
        /// Target state to drive the resource to.
        #[command(subcommand)]
        verb: ResourceVerb,
    },
    /// Print version information
    Version,
}

/// Options for the `apply` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ApplyOpts {
    /// DSL source file
    pub file: PathBuf,

    /// Override the target state of every resource
    #[arg(short, long)]
    pub state: Option<TargetState>,
}

/// Options for the `graph` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct GraphOpts {
    /// DSL source file
    pub file: PathBuf,

    /// Include author-declared `depends_on` edges
    #[arg(long)]
    pub all_edges: bool,

    /// Write an HTML viewer to this path instead of printing JSON
    #[arg(long, value_name = "PATH")]
    pub html: Option<PathBuf>,
}

/// Options for the `manifest` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ManifestOpts {
    /// Directory scanned breadth-first for `*.toml` manifests
    pub dir: PathBuf,

    /// Only load files matching this wildcard, relative to DIR (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Skip files matching this wildcard, relative to DIR (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Override the target state of every resource
    #[arg(short, long)]
    pub state: Option<TargetState>,
}

/// Options for the `resource` verbs.
#[derive(Parser, Debug, Clone)]
pub struct ResourceOpts {
    /// Manifest file describing the resource
    #[arg(short, long)]
    pub file: PathBuf,
}

/// State requested by `provision resource <verb>`.
#[derive(Subcommand, Debug, Clone)]
pub enum ResourceVerb {
    /// Use the state written in the manifest
    Apply(ResourceOpts),
    /// Ensure the resource exists
    Create(ResourceOpts),
    /// Ensure the resource is absent
    Delete(ResourceOpts),
    /// Check that the resource exists
    Exists(ResourceOpts),
    /// Check that the resource is absent
    Absent(ResourceOpts),
    /// Delete and create the resource
    Recreate(ResourceOpts),
}

impl ResourceVerb {
    /// Manifest file of this invocation.
    #[must_use]
    pub const fn opts(&self) -> &ResourceOpts {
        match self {
            Self::Apply(o)
            | Self::Create(o)
            | Self::Delete(o)
            | Self::Exists(o)
            | Self::Absent(o)
            | Self::Recreate(o) => o,
        }
    }

    /// State that replaces the manifest's own, if any.
    #[must_use]
    pub const fn state_override(&self) -> Option<TargetState> {
        match self {
            Self::Apply(_) => None,
            Self::Create(_) => Some(TargetState::Created),
            Self::Delete(_) => Some(TargetState::Deleted),
            Self::Exists(_) => Some(TargetState::Exists),
            Self::Absent(_) => Some(TargetState::Absent),
            Self::Recreate(_) => Some(TargetState::Recreated),
        }
    }
}

impl Command {
    /// Name used for the log file of this command.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Apply(_) => "apply",
            Self::Graph(_) => "graph",
            Self::Manifest(_) => "manifest",
            Self::Resource { .. } => "resource",
            Self::Version => "version",
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_apply() {
        let cli = Cli::parse_from(["provision", "apply", "infra.hcl"]);
        assert!(
            matches!(
                &cli.command,
                Command::Apply(opts)
                    if opts.file == PathBuf::from("infra.hcl") && opts.state.is_none()
            ),
            "Expected Apply command"
        );
    }

    #[test]
    fn parse_apply_with_state() {
        let cli = Cli::parse_from(["provision", "apply", "infra.hcl", "--state", "deleted"]);
        assert!(matches!(
            &cli.command,
            Command::Apply(opts) if opts.state == Some(TargetState::Deleted)
        ));
    }

    #[test]
    fn parse_apply_rejects_unknown_state() {
        let result = Cli::try_parse_from(["provision", "apply", "x", "--state", "gone"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_graph_all_edges() {
        let cli = Cli::parse_from(["provision", "graph", "infra.hcl", "--all-edges"]);
        assert!(matches!(&cli.command, Command::Graph(opts) if opts.all_edges));
    }

    #[test]
    fn parse_graph_html_path() {
        let cli = Cli::parse_from(["provision", "graph", "infra.hcl", "--html", "dag.html"]);
        assert!(matches!(
            &cli.command,
            Command::Graph(opts) if opts.html.as_deref() == Some(std::path::Path::new("dag.html"))
        ));
    }

    #[test]
    fn parse_manifest_dir() {
        let cli = Cli::parse_from(["provision", "manifest", "steps"]);
        assert!(matches!(
            &cli.command,
            Command::Manifest(opts) if opts.dir == PathBuf::from("steps")
        ));
    }

    #[test]
    fn parse_manifest_filters_repeat() {
        let cli = Cli::parse_from([
            "provision", "manifest", "steps", "--include", "*.toml", "--exclude", "old/*",
            "--exclude", "*.bak.toml",
        ]);
        assert!(matches!(
            &cli.command,
            Command::Manifest(opts) if opts.include == ["*.toml"] && opts.exclude.len() == 2
        ));
    }

    #[test]
    fn parse_resource_verbs_override_state() {
        let cases = [
            ("apply", None),
            ("create", Some(TargetState::Created)),
            ("delete", Some(TargetState::Deleted)),
            ("exists", Some(TargetState::Exists)),
            ("absent", Some(TargetState::Absent)),
            ("recreate", Some(TargetState::Recreated)),
        ];
        for (name, expected) in cases {
            let cli = Cli::parse_from(["provision", "resource", name, "--file", "a.toml"]);
            assert!(
                matches!(
                    &cli.command,
                    Command::Resource { verb }
                        if verb.state_override() == expected
                            && verb.opts().file == PathBuf::from("a.toml")
                ),
                "verb {name}"
            );
        }
    }

    #[test]
    fn parse_resource_requires_file() {
        assert!(Cli::try_parse_from(["provision", "resource", "create"]).is_err());
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["provision", "version"]);
        assert!(matches!(cli.command, Command::Version));
        assert_eq!(cli.command.log_name(), "version");
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["provision", "-v", "version"]);
        assert!(cli.verbose);
    }

    #[test]
    fn global_flags_select_run_options() {
        let cli = Cli::parse_from(["provision", "apply", "x", "--parallel", "--keep-going"]);
        let options = cli.global.run_options();
        assert!(options.parallel);
        assert_eq!(options.failure_policy, FailurePolicy::Continue);

        let cli = Cli::parse_from(["provision", "apply", "x"]);
        let options = cli.global.run_options();
        assert!(!options.parallel);
        assert_eq!(options.failure_policy, FailurePolicy::StopOnFirst);
    }
}
