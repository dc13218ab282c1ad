use crate::tracing::LogLevel;
use clap::{Args, Parser, Subcommand, ValueEnum};
use hookrun_hooks::MANIFEST_FILE;
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Environment, execution or internal error exit code
pub const EXIT_ERROR: i32 = 3;
/// Exit code for an interrupted run (128 + SIGINT)
pub const EXIT_CANCELLED: i32 = 130;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(hookrun::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Environment preparation or execution error (exit code 3)
    #[error("Execution error: {message}")]
    #[diagnostic(code(hookrun::cli::execution))]
    Execution {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The run was interrupted (exit code 130)
    #[error("Run cancelled")]
    #[diagnostic(code(hookrun::cli::cancelled))]
    Cancelled,
    /// Other unexpected error (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(hookrun::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new execution error
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error with help text
    #[must_use]
    pub fn other_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Convert `hookrun_hooks::Error` to the matching `CliError` variant.
///
/// - Configuration errors -> Config (exit code 2)
/// - Environment, execution and timeout errors -> Execution (exit code 3)
/// - Cancellation -> Cancelled (exit code 130)
/// - I/O, serialization, store and aggregation errors -> Other (exit code 3)
impl From<hookrun_hooks::Error> for CliError {
    fn from(err: hookrun_hooks::Error) -> Self {
        use hookrun_hooks::Error;
        match err {
            // Extract just the message to avoid "Configuration error: Configuration error:"
            Error::Configuration { message } => Self::config_with_help(
                message,
                format!("Fix the listed entries in {MANIFEST_FILE} and run again"),
            ),
            Error::Environment { .. } | Error::Execution { .. } | Error::Timeout { .. } => {
                Self::execution(err.to_string())
            }
            Error::Cancelled => Self::Cancelled,
            Error::Io {
                source,
                path,
                operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::other_with_help(
                    format!("I/O {operation} failed{path_str}: {source}"),
                    "Check file permissions and ensure the path exists",
                )
            }
            Error::Store(inner) => inner.into(),
            Error::Aggregation { .. } | Error::Serialization { .. } => Self::other(err.to_string()),
        }
    }
}

impl From<hookrun_cache::Error> for CliError {
    fn from(err: hookrun_cache::Error) -> Self {
        match err {
            hookrun_cache::Error::Configuration { message } => Self::config_with_help(
                message,
                "Set --cache-dir or HOOKRUN_CACHE_DIR to a writable directory",
            ),
            other => Self::other(other.to_string()),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Cancelled => EXIT_CANCELLED,
        CliError::Execution { .. } | CliError::Other { .. } => EXIT_ERROR,
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Execution { .. } => "execution",
                CliError::Cancelled => "cancelled",
                CliError::Other { .. } => "other",
            },
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Output format for command results
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    /// JSON output format
    Json,
    /// Plain text format
    #[default]
    Text,
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Main CLI entry point for hookrun.
///
/// Runs the hooks declared in a manifest against the files of a change.
#[derive(Parser, Debug)]
#[command(name = "hookrun")]
#[command(about = "Run manifest-declared hooks against the files of a change")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Emit JSON output instead of text.
    #[arg(long, global = true, help = "Emit JSON output and JSON event lines")]
    pub json: bool,

    /// Path to the manifest.
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "HOOKRUN_CONFIG",
        default_value = MANIFEST_FILE,
        help = "Path to the hook manifest"
    )]
    pub config: PathBuf,

    /// Environment store location.
    #[arg(
        long,
        global = true,
        env = "HOOKRUN_CACHE_DIR",
        help = "Directory holding prepared hook environments"
    )]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run hooks against the staged files (or the selected files).
    #[command(about = "Run hooks against the staged files")]
    Run(RunArgs),
    /// Load and resolve the manifest without running anything.
    #[command(about = "Validate the manifest without running hooks")]
    Validate,
    /// Delete every prepared environment.
    #[command(about = "Delete the environment store")]
    Clean,
    /// Show version information.
    #[command(about = "Show version information")]
    Version {
        /// Output format for version information.
        #[arg(
            long = "output",
            short = 'o',
            help = "Output format",
            value_enum,
            default_value_t = OutputFormat::Text
        )]
        output_format: OutputFormat,
    },
}

/// Arguments of `hookrun run`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Run against every tracked file instead of the staged ones.
    #[arg(long, conflicts_with = "files", help = "Run against every tracked file")]
    pub all_files: bool,

    /// Run against these files instead of the staged ones.
    #[arg(long, num_args = 1.., value_name = "PATH", help = "Run against these files")]
    pub files: Vec<String>,

    /// Only run these hooks (repeatable).
    #[arg(
        long = "hook",
        value_name = "ID",
        action = clap::ArgAction::Append,
        help = "Only run the hook with this id or alias (repeatable)"
    )]
    pub hooks: Vec<String>,

    /// Only run hooks registered for this stage.
    #[arg(long, value_name = "STAGE", help = "Only run hooks registered for this stage")]
    pub stage: Option<String>,

    /// Maximum number of hooks running at once.
    #[arg(
        long,
        short = 'j',
        env = "HOOKRUN_JOBS",
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Maximum number of hooks running at once (default: number of CPUs)"
    )]
    pub jobs: Option<u16>,

    /// Show output and detail events for every hook.
    #[arg(long, short = 'v', help = "Show output of every hook and build details")]
    pub verbose: bool,

    /// Hooks recorded as skipped without running.
    #[arg(
        long,
        env = "SKIP",
        value_name = "IDS",
        help = "Comma-separated hook ids or aliases to skip"
    )]
    pub skip: Vec<String>,
}

/// Parse command line arguments into a CLI structure.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
