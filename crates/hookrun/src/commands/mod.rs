//! Command implementations
//!
//! Each command returns what should be written to stdout and the process
//! exit code; printing is left to the binary.

pub mod clean;
pub mod run;
pub mod validate;
pub mod version;

use crate::cli::{CliError, Commands, EXIT_OK};
use hookrun_cache::EnvironmentStore;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Manifest path as given
    pub config: PathBuf,
    /// Explicit environment store location
    pub cache_dir: Option<PathBuf>,
    /// Emit JSON instead of text
    pub json: bool,
    /// Use ANSI colors in text output
    pub colors: bool,
}

impl CommandContext {
    /// Absolute manifest path.
    pub fn manifest_path(&self) -> Result<PathBuf, CliError> {
        if self.config.is_absolute() {
            return Ok(self.config.clone());
        }
        let cwd = std::env::current_dir().map_err(|e| {
            CliError::other_with_help(
                format!("cannot determine the working directory: {e}"),
                "Run hookrun from an existing directory",
            )
        })?;
        Ok(cwd.join(&self.config))
    }

    /// Project root: the directory holding the manifest.
    pub fn project_root(&self) -> Result<PathBuf, CliError> {
        let manifest = self.manifest_path()?;
        Ok(manifest
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf))
    }

    /// Environment store at `--cache-dir`, or the default location.
    pub fn store(&self) -> Result<EnvironmentStore, CliError> {
        match &self.cache_dir {
            Some(dir) => Ok(EnvironmentStore::new(dir)),
            None => Ok(EnvironmentStore::open_default()?),
        }
    }
}

/// Result of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Text for stdout
    pub stdout: String,
    /// Process exit code
    pub exit_code: i32,
}

impl CommandOutput {
    /// Successful output.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: EXIT_OK,
        }
    }
}

/// Dispatch a parsed subcommand.
pub async fn execute(
    command: Commands,
    ctx: &CommandContext,
    cancel: &CancellationToken,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Run(args) => run::execute(ctx, args, cancel).await,
        Commands::Validate => validate::execute(ctx).await,
        Commands::Clean => clean::execute(ctx),
        Commands::Version { output_format } => version::execute(output_format),
    }
}
