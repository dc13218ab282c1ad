//! hookrun - manifest-driven hook runner
//!
//! Library side of the `hookrun` binary: argument parsing, tracing setup,
//! signal handling, changeset collection and the command implementations.
//! The engine itself lives in `hookrun-hooks`.

// CLI error rendering writes to stdout/stderr directly
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![expect(
    clippy::missing_errors_doc,
    reason = "Error documentation to be added incrementally"
)]

/// Candidate files from git or the command line.
pub mod changeset;
/// CLI argument parsing and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Signal handling.
pub mod shutdown;
/// Tracing and logging configuration.
pub mod tracing;

pub use cli::{Cli, CliError, Commands, EXIT_CANCELLED, EXIT_CLI, EXIT_ERROR, EXIT_OK};
