//! `hookrun validate`

use super::{CommandContext, CommandOutput};
use crate::cli::{CliError, OkEnvelope};
use hookrun_hooks::{Engine, ResolvedManifest, RunConfig};
use serde::Serialize;
use std::fmt::Write as _;

/// Summary of one resolved hook.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HookSummary {
    /// Effective id
    pub id: String,
    /// Display name
    pub name: String,
    /// Source identity
    pub source: String,
    /// Installer language
    pub language: String,
    /// Stages, or `None` for every stage
    pub stages: Option<Vec<String>>,
}

/// Summarize a resolved manifest in declaration order.
#[must_use]
pub fn summarize(manifest: &ResolvedManifest) -> Vec<HookSummary> {
    manifest
        .hooks
        .iter()
        .map(|hook| HookSummary {
            id: hook.id.clone(),
            name: hook.name.clone(),
            source: hook.source.identity.clone(),
            language: hook.language.clone(),
            stages: hook.stages.clone(),
        })
        .collect()
}

/// Load and resolve the manifest; nothing is executed.
pub async fn execute(ctx: &CommandContext) -> Result<CommandOutput, CliError> {
    let manifest_path = ctx.manifest_path()?;
    let root = ctx.project_root()?;
    let engine = Engine::new(&root, ctx.store()?, RunConfig::default());
    let manifest = engine.load(&manifest_path).await?;
    let hooks = summarize(&manifest);

    if ctx.json {
        let json = serde_json::to_string_pretty(&OkEnvelope::new(&hooks))
            .map_err(|e| CliError::other(format!("Failed to encode output: {e}")))?;
        return Ok(CommandOutput::ok(json));
    }

    let mut out = format!(
        "{} is valid: {} hook(s)\n",
        manifest_path.display(),
        hooks.len()
    );
    for hook in &hooks {
        let stages = hook
            .stages
            .as_ref()
            .map_or_else(|| "all stages".to_string(), |s| s.join(", "));
        let _ = writeln!(
            out,
            "  {} ({}) [{}] from {}: {stages}",
            hook.id, hook.name, hook.language, hook.source
        );
    }
    Ok(CommandOutput::ok(out))
}
