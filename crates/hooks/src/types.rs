//! Type definitions for hooks and hook outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// A file filter as written in YAML: a regular expression, or `false` to
/// switch the filter off entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PatternSetting {
    /// `false` disables the filter, `true` is rejected during validation
    Toggle(bool),
    /// Regular expression searched against relative paths
    Pattern(String),
}

impl PatternSetting {
    /// The pattern text, or `None` when the filter is switched off or empty.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::Pattern(p) if !p.is_empty() => Some(p),
            _ => None,
        }
    }
}

/// A hook as published by a hook source.
///
/// Every field besides `id` may be overridden from the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HookDefinition {
    /// Identifier referenced from manifests
    pub id: String,
    /// Display name (defaults to the id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Command line to run, split with shell quoting rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    /// Installer used to prepare the environment (`system`, `script`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Runtime version pin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_version: Option<String>,
    /// Include filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<PatternSetting>,
    /// Exclude filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<PatternSetting>,
    /// Arguments placed between the entry and the file list
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra packages installed into the environment
    #[serde(default)]
    pub additional_dependencies: Vec<String>,
    /// Stages the hook runs in (all when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<String>>,
    /// Per-invocation timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    /// Run even when no file matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_run: Option<bool>,
    /// Append matching files to the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_filenames: Option<bool>,
    /// Never run alongside another hook
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_serial: Option<bool>,
    /// Stop starting further hooks once this one fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
    /// Rewrites files in place (auto-fix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifies_files: Option<bool>,
    /// Always show captured output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

/// Final status of one hook.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HookStatus {
    /// Every invocation exited 0
    Passed,
    /// An invocation exited non-zero
    Failed,
    /// The hook could not be carried out (environment, spawn, timeout, cancel)
    Errored,
    /// Not executed
    Skipped,
}

impl HookStatus {
    /// Status name as shown to users.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Skipped => "skipped",
        }
    }

    /// `failed` or `errored`
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Errored)
    }
}

impl fmt::Display for HookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded result of one planned hook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    /// Declaration index in the manifest
    pub index: usize,
    /// Effective hook id (alias, else id)
    pub id: String,
    /// Display name
    pub name: String,
    /// Final status
    pub status: HookStatus,
    /// Exit code of the first failing invocation, or of the last one
    pub exit_code: Option<i32>,
    /// Captured stdout of all invocations
    pub stdout: String,
    /// Captured stderr of all invocations
    pub stderr: String,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Whether any of the hook's files changed while it ran
    pub files_modified: bool,
    /// Number of invocations made
    pub batches: usize,
    /// Number of files handed to the hook
    pub file_count: usize,
    /// Why the hook was skipped or errored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Show captured output even on success
    #[serde(default)]
    pub verbose: bool,
}

impl Outcome {
    /// Outcome of a hook that was not executed
    #[must_use]
    pub fn skipped(index: usize, id: &str, name: &str, reason: impl Into<String>) -> Self {
        Self::bare(index, id, name, HookStatus::Skipped, Some(reason.into()))
    }

    /// Outcome of a hook that could not be carried out
    #[must_use]
    pub fn errored(index: usize, id: &str, name: &str, reason: impl Into<String>) -> Self {
        Self::bare(index, id, name, HookStatus::Errored, Some(reason.into()))
    }

    fn bare(
        index: usize,
        id: &str,
        name: &str,
        status: HookStatus,
        reason: Option<String>,
    ) -> Self {
        Self {
            index,
            id: id.to_string(),
            name: name.to_string(),
            status,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
            files_modified: false,
            batches: 0,
            file_count: 0,
            reason,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_setting_deserializes_string_or_bool() {
        let p: PatternSetting = serde_yaml::from_str("'\\.py$'").unwrap();
        assert_eq!(p.pattern(), Some("\\.py$"));

        let off: PatternSetting = serde_yaml::from_str("false").unwrap();
        assert_eq!(off, PatternSetting::Toggle(false));
        assert_eq!(off.pattern(), None);

        let empty = PatternSetting::Pattern(String::new());
        assert_eq!(empty.pattern(), None);
    }

    #[test]
    fn test_definition_rejects_unknown_fields() {
        let yaml = "id: fmt\nentry: fmt\nlanguage: system\nfilez: x\n";
        assert!(serde_yaml::from_str::<HookDefinition>(yaml).is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&HookStatus::Skipped).unwrap(),
            "\"skipped\""
        );
        assert!(HookStatus::Errored.is_failure());
        assert!(!HookStatus::Skipped.is_failure());
    }

    #[test]
    fn test_skipped_outcome() {
        let outcome = Outcome::skipped(2, "mypy", "Type check", "no files to check");
        assert_eq!(outcome.status, HookStatus::Skipped);
        assert_eq!(outcome.reason.as_deref(), Some("no files to check"));
        assert_eq!(outcome.batches, 0);
    }
}
