//! `hookrun run`

use super::{CommandContext, CommandOutput};
use crate::changeset::Changeset;
use crate::cli::{CliError, RunArgs};
use hookrun_hooks::{Engine, RunConfig, parse_hook_list};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, instrument};

/// Settings of the run described by `args`.
#[must_use]
pub fn run_config(args: &RunArgs) -> RunConfig {
    let mut config = RunConfig {
        stage: args.stage.clone(),
        hook_ids: args.hooks.clone(),
        skip: args.skip.iter().flat_map(|s| parse_hook_list(s)).collect(),
        verbose: args.verbose,
        ..RunConfig::default()
    };
    if let Some(jobs) = args.jobs {
        config.jobs = usize::from(jobs);
    }
    config
}

/// Resolve the manifest, collect the changeset and run the hooks.
///
/// The exit code reflects the run's verdict; hook failures are not errors.
#[instrument(name = "run_command", skip_all)]
pub async fn execute(
    ctx: &CommandContext,
    args: RunArgs,
    cancel: &CancellationToken,
) -> Result<CommandOutput, CliError> {
    let manifest_path = ctx.manifest_path()?;
    let root = ctx.project_root()?;
    let engine = Engine::new(&root, ctx.store()?, run_config(&args));

    // Resolve before looking at git so manifest errors surface first
    let manifest = engine.load(&manifest_path).await?;
    let candidates = Changeset::from_flags(args.all_files, args.files)
        .collect(&root)
        .await?;

    let report = engine
        .run(&manifest, candidates, cancel)
        .instrument(crate::command_span!("run"))
        .await?;

    let stdout = if ctx.json {
        report.to_json()?
    } else {
        report.render_text(ctx.colors, args.verbose)
    };
    Ok(CommandOutput {
        stdout,
        exit_code: report.exit_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_from_args() {
        let args = RunArgs {
            hooks: vec!["fmt".to_string()],
            stage: Some("pre-push".to_string()),
            jobs: Some(3),
            skip: vec!["slow".to_string()],
            verbose: true,
            ..RunArgs::default()
        };
        let config = run_config(&args);
        assert_eq!(config.jobs, 3);
        assert_eq!(config.hook_ids, ["fmt"]);
        assert_eq!(config.skip, ["slow"]);
        assert_eq!(config.stage.as_deref(), Some("pre-push"));
        assert!(config.verbose);
    }

    #[test]
    fn test_skip_lists_are_split_and_trimmed() {
        let args = RunArgs {
            skip: vec!["flake8, mypy,,".to_string(), "slow".to_string()],
            ..RunArgs::default()
        };
        assert_eq!(run_config(&args).skip, ["flake8", "mypy", "slow"]);
    }

    #[test]
    fn test_jobs_default_to_available_parallelism() {
        let config = run_config(&RunArgs::default());
        assert_eq!(config.jobs, hookrun_hooks::config::default_jobs());
    }
}
