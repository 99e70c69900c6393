//! Declarative resource provisioning engine.
//!
//! Resources are declared either in a small HCL-like DSL or in one TOML
//! manifest per resource, ordered by their dependencies, and driven to a
//! target state through a reconciliation program of checks and mutations.
//!
//! The public API is organised into layers:
//!
//! - **[`dsl`]**: parse and flatten source into a set of named nodes
//! - **[`graph`]**: dependency graphs with cycle detection and node-link JSON
//! - **[`config`]**: load and validate resource manifests
//! - **[`resources`]**: adapter families that check and mutate real resources
//! - **[`engine`]**: the transition language and its interpreter
//! - **[`plan`]**: batch execution in dependency order, optionally in parallel
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod graph;
pub mod logging;
pub mod plan;
pub mod resources;
