//! `hookrun clean`

use super::{CommandContext, CommandOutput};
use crate::cli::{CliError, OkEnvelope};
use tracing::info;

/// Delete every prepared environment.
pub fn execute(ctx: &CommandContext) -> Result<CommandOutput, CliError> {
    let store = ctx.store()?;
    let removed = store.clean()?;
    info!(root = %store.root().display(), removed, "Environment store cleaned");

    if ctx.json {
        let json = serde_json::to_string(&OkEnvelope::new(serde_json::json!({
            "root": store.root(),
            "removed": removed,
        })))
        .map_err(|e| CliError::other(format!("Failed to encode output: {e}")))?;
        return Ok(CommandOutput::ok(json));
    }
    Ok(CommandOutput::ok(format!(
        "Removed {removed} environment(s) from {}",
        store.root().display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_clean_empty_store() {
        let tmp = TempDir::new().unwrap();
        let ctx = CommandContext {
            config: PathBuf::from(".hookrun.yaml"),
            cache_dir: Some(tmp.path().join("cache")),
            json: false,
            colors: false,
        };
        let output = execute(&ctx).unwrap();
        assert!(output.stdout.starts_with("Removed 0 environment(s)"));
        assert_eq!(output.exit_code, 0);
    }
}
