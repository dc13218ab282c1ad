use super::CommandOutput;
use crate::cli::{CliError, OkEnvelope, OutputFormat};
use serde::Serialize;

/// Build and runtime details reported by `hookrun version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Package name
    pub name: &'static str,
    /// Package version
    pub version: &'static str,
    /// Package description
    pub description: &'static str,
    /// Target platform
    pub platform: String,
    /// Session correlation id
    pub correlation_id: String,
}

/// Gather version details for this binary.
#[must_use]
pub fn get_version_info() -> VersionInfo {
    let info = VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        platform: hookrun_cache::current_platform(),
        correlation_id: hookrun_events::correlation_id().to_string(),
    };
    tracing::debug!(
        package_name = info.name,
        package_version = info.version,
        platform = %info.platform,
        "Gathered version information"
    );
    info
}

/// Render version details in `format`.
pub fn execute(format: OutputFormat) -> Result<CommandOutput, CliError> {
    let info = get_version_info();
    let stdout = match format {
        OutputFormat::Json => serde_json::to_string(&OkEnvelope::new(&info))
            .map_err(|e| CliError::other(format!("Failed to encode output: {e}")))?,
        OutputFormat::Text => format!(
            "{} {} - {}\nPlatform: {}\nCorrelation ID: {}",
            info.name, info.version, info.description, info.platform, info.correlation_id
        ),
    };
    Ok(CommandOutput::ok(stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_text() {
        let output = execute(OutputFormat::Text).unwrap();
        assert!(output.stdout.starts_with("hookrun "));
        assert!(output.stdout.contains(env!("CARGO_PKG_VERSION")));

        let correlation_line = output
            .stdout
            .lines()
            .find(|line| line.starts_with("Correlation ID:"))
            .unwrap();
        let uuid_part = correlation_line.trim_start_matches("Correlation ID:").trim();
        assert_eq!(uuid_part.len(), 36);
    }

    #[test]
    fn test_version_json() {
        let output = execute(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"]["name"], "hookrun");
    }

    #[test]
    fn test_correlation_id_is_stable() {
        assert_eq!(
            get_version_info().correlation_id,
            get_version_info().correlation_id
        );
    }
}
