//! `provision` command-line entry point.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use provision_cli::cli::{self, Command};
use provision_cli::{commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let name = args.command.log_name();
    logging::init_subscriber(args.verbose, name);
    let log = Arc::new(logging::Logger::new(name));

    match &args.command {
        Command::Apply(opts) => commands::apply::run(&args.global, opts, &log),
        Command::Graph(opts) => commands::graph::run(opts, &log),
        Command::Manifest(opts) => commands::manifest::run(&args.global, opts, &log),
        Command::Resource { verb } => commands::resource::run(verb, &log),
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
