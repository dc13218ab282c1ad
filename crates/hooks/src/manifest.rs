//! Manifest model: parsing, merging and validation of `.hookrun.yaml`
//!
//! A [`Manifest`] is the document as written. [`Manifest::resolve`] turns it
//! into a [`ResolvedManifest`]: every source resolved once, every entry
//! merged with the definition it references, every pattern compiled. Any
//! problem anywhere aborts the whole resolution, and all problems are
//! reported together so a broken manifest can be fixed in one pass.

use crate::config::DEFAULT_TIMEOUT_SECONDS;
use crate::environment::EnvironmentKey;
use crate::selector::FileFilter;
use crate::source::{HookSource, LOCAL_SOURCE, SourceRegistry, SourceRequest};
use crate::types::{HookDefinition, PatternSetting};
use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default manifest file name.
pub const MANIFEST_FILE: &str = ".hookrun.yaml";

const fn default_true() -> bool {
    true
}

/// The manifest document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Stop starting hooks after the first failure
    #[serde(default)]
    pub fail_fast: bool,
    /// Global include filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<PatternSetting>,
    /// Global exclude filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<PatternSetting>,
    /// Files larger than this many bytes are never handed to hooks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<i64>,
    /// Default per-invocation timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    /// Treat files rewritten by hooks as a failed run
    #[serde(default = "default_true")]
    pub fail_on_modified: bool,
    /// Language version used when neither the entry nor the manifest pins one
    #[serde(default)]
    pub default_language_version: BTreeMap<String, String>,
    /// Stages for hooks that do not list their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_stages: Option<Vec<String>>,
    /// Hook sources in declaration order
    #[serde(default)]
    pub repos: Vec<RepoEntry>,
}

/// One `repos` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RepoEntry {
    /// Location reference (`local`, a path or a `file://` URL)
    pub repo: String,
    /// Pinned revision; required for everything but `local`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Hooks used from this source
    #[serde(default)]
    pub hooks: Vec<ManifestEntry>,
}

/// A reference to a hook definition plus overrides.
///
/// For `repo: local` the entry is the definition itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// Referenced hook id
    pub id: String,
    /// Alternative identifier, for using one hook twice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Command line replacing the definition's entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    /// Only allowed on local hooks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Runtime version pin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_version: Option<String>,
    /// Replaces the definition's include filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<PatternSetting>,
    /// Added to the definition's exclude filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<PatternSetting>,
    /// Appended to the definition's arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Appended to the definition's dependencies
    #[serde(default)]
    pub additional_dependencies: Vec<String>,
    /// Stages the hook runs in
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
    /// Rewrites files in place
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifies_files: Option<bool>,
    /// Always show captured output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

impl ManifestEntry {
    /// View an inline (`local`) entry as a hook definition.
    #[must_use]
    pub fn to_definition(&self) -> HookDefinition {
        HookDefinition {
            id: self.id.clone(),
            name: self.name.clone(),
            entry: self.entry.clone(),
            language: self.language.clone(),
            language_version: self.language_version.clone(),
            files: self.files.clone(),
            exclude: self.exclude.clone(),
            args: self.args.clone(),
            additional_dependencies: self.additional_dependencies.clone(),
            stages: self.stages.clone(),
            timeout: self.timeout,
            always_run: self.always_run,
            pass_filenames: self.pass_filenames,
            require_serial: self.require_serial,
            fail_fast: self.fail_fast,
            modifies_files: self.modifies_files,
            verbose: self.verbose,
        }
    }

    /// Identifier the hook is known by in this run.
    #[must_use]
    pub fn effective_id(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.id)
    }
}

/// One hook, merged and validated, ready to run.
#[derive(Debug, Clone)]
pub struct ResolvedHook {
    /// Declaration index across the whole manifest
    pub index: usize,
    /// Effective identifier (alias, else id)
    pub id: String,
    /// Id of the referenced definition
    pub hook_id: String,
    /// Alias from the manifest, if any
    pub alias: Option<String>,
    /// Display name
    pub name: String,
    /// Entry split into program and leading arguments
    pub command: Vec<String>,
    /// Installer language
    pub language: String,
    /// Runtime version (`default` when unpinned)
    pub language_version: String,
    /// Merged arguments
    pub args: Vec<String>,
    /// Merged extra dependencies
    pub additional_dependencies: Vec<String>,
    /// Compiled include/exclude filters
    pub filter: FileFilter,
    /// Stages the hook runs in; `None` means every stage
    pub stages: Option<Vec<String>>,
    /// Per-invocation timeout
    pub timeout: Duration,
    /// Run once with no files when nothing matches
    pub always_run: bool,
    /// Append files to the command line
    pub pass_filenames: bool,
    /// Run with no other hook in flight
    pub require_serial: bool,
    /// Skip not-yet-started hooks once this one fails
    pub fail_fast: bool,
    /// Auto-fix hook; never overlaps hooks sharing its files
    pub modifies_files: bool,
    /// Show output even on success
    pub verbose: bool,
    /// Source the definition came from
    pub source: Arc<HookSource>,
}

impl ResolvedHook {
    /// Key of the environment this hook runs in.
    #[must_use]
    pub fn environment_key(&self) -> EnvironmentKey {
        EnvironmentKey::new(
            &self.source.identity,
            &self.source.revision,
            &self.language,
            &self.language_version,
            self.additional_dependencies.clone(),
        )
    }

    /// Whether the hook is registered for `stage`.
    #[must_use]
    pub fn runs_in_stage(&self, stage: &str) -> bool {
        self.stages
            .as_ref()
            .is_none_or(|stages| stages.iter().any(|s| s == stage))
    }
}

/// A fully validated manifest.
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    /// Hooks in declaration order
    pub hooks: Vec<ResolvedHook>,
    /// Filter applied to every hook's candidates
    pub global_filter: FileFilter,
    /// Size limit applied before any matching
    pub max_file_size: Option<u64>,
    /// Global fail-fast
    pub fail_fast: bool,
    /// Aggregation policy for rewritten files
    pub fail_on_modified: bool,
}

/// Accumulates validation problems, labelled with the offending entry.
#[derive(Debug, Default)]
struct Issues(Vec<String>);

impl Issues {
    fn push(&mut self, label: &str, reason: impl std::fmt::Display) {
        self.0.push(format!("{label}: {reason}"));
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_error(self) -> Error {
        let count = self.0.len();
        Error::configuration(format!(
            "{count} problem(s) in manifest:\n  - {}",
            self.0.join("\n  - ")
        ))
    }
}

fn compile_pattern(field: &str, setting: &PatternSetting) -> std::result::Result<Option<Regex>, String> {
    match setting {
        PatternSetting::Toggle(false) => Ok(None),
        PatternSetting::Toggle(true) => Err(format!(
            "{field} must be a regular expression or false, not true"
        )),
        PatternSetting::Pattern(p) if p.is_empty() => Ok(None),
        PatternSetting::Pattern(p) => Regex::new(p)
            .map(Some)
            .map_err(|_| format!("invalid {field} pattern '{p}'")),
    }
}

fn non_negative(field: &str, value: Option<i64>) -> std::result::Result<Option<u64>, String> {
    match value {
        None => Ok(None),
        Some(v) => u64::try_from(v)
            .map(Some)
            .map_err(|_| format!("{field} must be non-negative (got {v})")),
    }
}

fn timeout_seconds(value: Option<i64>) -> std::result::Result<Option<u64>, String> {
    match non_negative("timeout", value)? {
        Some(0) => Err("timeout must be at least one second".to_string()),
        other => Ok(other),
    }
}

impl Manifest {
    /// Parse a manifest from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Err(Error::configuration("manifest is empty"));
        }
        serde_yaml::from_str(contents)
            .map_err(|e| Error::configuration(format!("invalid manifest: {e}")))
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read manifest {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Resolve sources, merge overrides and validate every entry.
    ///
    /// Either every entry is valid and a complete [`ResolvedManifest`] is
    /// returned, or a single configuration error lists every problem.
    #[instrument(name = "manifest_resolve", skip_all, fields(repos = self.repos.len()))]
    pub async fn resolve(
        &self,
        sources: &SourceRegistry,
        project_root: &Path,
    ) -> Result<ResolvedManifest> {
        let mut issues = Issues::default();

        let global_files = self
            .files
            .as_ref()
            .map(|s| compile_pattern("files", s))
            .transpose()
            .unwrap_or_else(|e| {
                issues.push("files", e);
                None
            })
            .flatten();
        let global_exclude = self
            .exclude
            .as_ref()
            .map(|s| compile_pattern("exclude", s))
            .transpose()
            .unwrap_or_else(|e| {
                issues.push("exclude", e);
                None
            })
            .flatten();
        let max_file_size =
            non_negative("max_file_size", self.max_file_size).unwrap_or_else(|e| {
                issues.push("max_file_size", e);
                None
            });
        let default_timeout = timeout_seconds(self.timeout)
            .unwrap_or_else(|e| {
                issues.push("timeout", e);
                None
            })
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        let mut hooks = Vec::new();
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut index = 0;

        for (repo_index, repo) in self.repos.iter().enumerate() {
            let repo_label = format!("repos[{repo_index}] '{}'", repo.repo);
            let local = repo.repo == LOCAL_SOURCE;

            if repo.repo.trim().is_empty() {
                issues.push(&format!("repos[{repo_index}]"), "repo must not be empty");
                index += repo.hooks.len();
                continue;
            }
            let revision = repo.rev.as_deref().filter(|r| !r.trim().is_empty());
            if !local && revision.is_none() {
                issues.push(&repo_label, "missing rev (sources must be pinned)");
            }

            let source = match sources
                .resolve(SourceRequest {
                    location: &repo.repo,
                    revision,
                    project_root,
                    entries: &repo.hooks,
                })
                .await
            {
                Ok(source) => Arc::new(source),
                Err(Error::Configuration { message }) => {
                    issues.push(&repo_label, message);
                    index += repo.hooks.len();
                    continue;
                }
                Err(e) => return Err(e),
            };

            for (hook_index, entry) in repo.hooks.iter().enumerate() {
                let label = format!(
                    "repos[{repo_index}].hooks[{hook_index}] '{}'",
                    entry.effective_id()
                );
                let declared = index;
                index += 1;

                if entry.id.trim().is_empty() {
                    issues.push(&label, "missing id");
                    continue;
                }

                let effective = entry.effective_id().to_string();
                if let Some(previous) = seen.get(&effective) {
                    issues.push(
                        &label,
                        format!("duplicate hook id '{effective}' (first declared at {previous})"),
                    );
                } else {
                    seen.insert(effective, format!("repos[{repo_index}].hooks[{hook_index}]"));
                }

                match self.merge(entry, &source, declared, default_timeout) {
                    Ok(hook) => hooks.push(hook),
                    Err(reasons) => {
                        for reason in reasons {
                            issues.push(&label, reason);
                        }
                    }
                }
            }
        }

        if !issues.is_empty() {
            return Err(issues.into_error());
        }

        debug!(hooks = hooks.len(), "Manifest resolved");
        Ok(ResolvedManifest {
            hooks,
            global_filter: FileFilter::new(global_files, global_exclude.into_iter().collect()),
            max_file_size,
            fail_fast: self.fail_fast,
            fail_on_modified: self.fail_on_modified,
        })
    }

    /// Merge one entry with the definition it references.
    fn merge(
        &self,
        entry: &ManifestEntry,
        source: &Arc<HookSource>,
        index: usize,
        default_timeout: u64,
    ) -> std::result::Result<ResolvedHook, Vec<String>> {
        let mut reasons = Vec::new();
        let local = source.is_local();

        // Inline hooks are looked up by position, ids may repeat under aliases
        let inline;
        let definition = if local {
            inline = entry.to_definition();
            &inline
        } else if let Some(found) = source.definition(&entry.id) {
            found
        } else {
            return Err(vec![format!(
                "hook id '{}' not found in source '{}'",
                entry.id, source.identity
            )]);
        };

        // Inline hooks are their own definition; nothing to layer on top
        let empty = ManifestEntry::default();
        let overrides = if local { &empty } else { entry };

        if !local && entry.language.is_some() {
            reasons.push("language can only be set on local hooks".to_string());
        }

        let entry_text = overrides.entry.as_ref().or(definition.entry.as_ref());
        let command = match entry_text {
            None => {
                reasons.push("missing entry".to_string());
                Vec::new()
            }
            Some(text) => match shlex::split(text) {
                Some(parts) if !parts.is_empty() => parts,
                _ => {
                    reasons.push(format!("entry '{text}' is not a valid command line"));
                    Vec::new()
                }
            },
        };

        let language = definition.language.clone().unwrap_or_else(|| {
            reasons.push("missing language".to_string());
            String::new()
        });

        // Inline hooks carry their pin on the entry; the definition is the entry itself
        let published_version = if local {
            None
        } else {
            definition.language_version.clone()
        };
        let language_version = entry
            .language_version
            .clone()
            .or_else(|| self.default_language_version.get(&language).cloned())
            .or(published_version)
            .unwrap_or_else(|| "default".to_string());

        let include = match overrides.files.as_ref().or(definition.files.as_ref()) {
            None => None,
            Some(setting) => compile_pattern("files", setting).unwrap_or_else(|e| {
                reasons.push(e);
                None
            }),
        };

        let mut excludes = Vec::new();
        let own_exclude = definition.exclude.as_ref();
        match overrides.exclude.as_ref() {
            Some(PatternSetting::Toggle(false)) => {}
            extra => {
                for setting in own_exclude.into_iter().chain(extra) {
                    match compile_pattern("exclude", setting) {
                        Ok(Some(regex)) => excludes.push(regex),
                        Ok(None) => {}
                        Err(e) => reasons.push(e),
                    }
                }
            }
        }

        let timeout = match timeout_seconds(overrides.timeout.or(definition.timeout)) {
            Ok(seconds) => seconds.unwrap_or(default_timeout),
            Err(e) => {
                reasons.push(e);
                default_timeout
            }
        };

        let stages = overrides
            .stages
            .clone()
            .or_else(|| definition.stages.clone())
            .or_else(|| self.default_stages.clone());

        if !reasons.is_empty() {
            return Err(reasons);
        }

        let flag = |o: Option<bool>, d: Option<bool>, default: bool| o.or(d).unwrap_or(default);

        Ok(ResolvedHook {
            index,
            id: entry.effective_id().to_string(),
            hook_id: entry.id.clone(),
            alias: entry.alias.clone(),
            name: overrides
                .name
                .clone()
                .or_else(|| definition.name.clone())
                .unwrap_or_else(|| entry.effective_id().to_string()),
            command,
            language,
            language_version,
            args: definition
                .args
                .iter()
                .chain(&overrides.args)
                .cloned()
                .collect(),
            additional_dependencies: definition
                .additional_dependencies
                .iter()
                .chain(&overrides.additional_dependencies)
                .cloned()
                .collect(),
            filter: FileFilter::new(include, excludes),
            stages,
            timeout: Duration::from_secs(timeout),
            always_run: flag(overrides.always_run, definition.always_run, false),
            pass_filenames: flag(overrides.pass_filenames, definition.pass_filenames, true),
            require_serial: flag(overrides.require_serial, definition.require_serial, false),
            fail_fast: flag(overrides.fail_fast, definition.fail_fast, false),
            modifies_files: flag(overrides.modifies_files, definition.modifies_files, false),
            verbose: flag(overrides.verbose, definition.verbose, false),
            source: Arc::clone(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DEFINITIONS_FILE;
    use tempfile::TempDir;

    const SHARED_HOOKS: &str = r"
- id: trailing-whitespace
  name: Trim trailing whitespace
  entry: ./trim.sh --check
  language: script
  args: [--strict]
  exclude: '\.patch$'
  files: '\.(md|txt)$'
  modifies_files: true
- id: lint
  entry: lint
  language: system
  language_version: '1.0'
  stages: [pre-push]
";

    fn project() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let shared = tmp.path().join("shared-hooks");
        std::fs::create_dir_all(&shared).unwrap();
        std::fs::write(shared.join(DEFINITIONS_FILE), SHARED_HOOKS).unwrap();
        tmp
    }

    async fn resolve(tmp: &TempDir, yaml: &str) -> Result<ResolvedManifest> {
        Manifest::from_yaml_str(yaml)?
            .resolve(&SourceRegistry::with_defaults(), tmp.path())
            .await
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = Manifest::from_yaml_str("repos: []\nfail_fsat: true\n").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let yaml = "repos:\n  - repo: local\n    hooks:\n      - id: x\n        argz: []\n";
        assert!(Manifest::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_empty_manifest_is_rejected() {
        assert!(Manifest::from_yaml_str("  \n").is_err());
    }

    #[test]
    fn test_defaults() {
        let manifest = Manifest::from_yaml_str("repos: []\n").unwrap();
        assert!(manifest.fail_on_modified);
        assert!(!manifest.fail_fast);
        assert!(manifest.max_file_size.is_none());
    }

    #[tokio::test]
    async fn test_local_hooks_resolve_in_declaration_order() {
        let tmp = project();
        let resolved = resolve(
            &tmp,
            r"
repos:
  - repo: local
    hooks:
      - id: a
        entry: echo a
        language: system
      - id: b
        entry: 'sh -c ''exit 0'''
        language: system
        always_run: true
        pass_filenames: false
",
        )
        .await
        .unwrap();

        assert_eq!(resolved.hooks.len(), 2);
        let b = &resolved.hooks[1];
        assert_eq!(b.index, 1);
        assert_eq!(b.command, vec!["sh", "-c", "exit 0"]);
        assert!(b.always_run);
        assert!(!b.pass_filenames);
        assert_eq!(b.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
        assert!(b.source.is_local());
    }

    #[tokio::test]
    async fn test_overrides_merge_with_definition() {
        let tmp = project();
        let resolved = resolve(
            &tmp,
            r"
timeout: 60
default_language_version:
  system: '2.0'
repos:
  - repo: ./shared-hooks
    rev: v1.4.0
    hooks:
      - id: trailing-whitespace
        args: [--markdown-linebreak-ext=md]
        exclude: '^docs/'
      - id: lint
        alias: lint-strict
        args: [--strict]
        timeout: 5
",
        )
        .await
        .unwrap();

        let trim = &resolved.hooks[0];
        assert_eq!(trim.name, "Trim trailing whitespace");
        assert_eq!(trim.args, vec!["--strict", "--markdown-linebreak-ext=md"]);
        assert_eq!(trim.command, vec!["./trim.sh", "--check"]);
        assert_eq!(trim.timeout, Duration::from_secs(60));
        assert!(trim.modifies_files);
        // Both the definition's and the manifest's exclude apply
        assert!(trim.filter.matches("README.md"));
        assert!(!trim.filter.matches("docs/README.md"));
        assert!(!trim.filter.matches("fix.patch"));
        assert!(!trim.filter.matches("main.rs"));

        let lint = &resolved.hooks[1];
        assert_eq!(lint.id, "lint-strict");
        assert_eq!(lint.hook_id, "lint");
        assert_eq!(lint.timeout, Duration::from_secs(5));
        // Manifest default beats the definition's own pin
        assert_eq!(lint.language_version, "2.0");
        assert_eq!(lint.stages.as_deref(), Some(&["pre-push".to_string()][..]));
        assert_eq!(lint.source.revision, "v1.4.0");
    }

    #[tokio::test]
    async fn test_false_disables_filters() {
        let tmp = project();
        let resolved = resolve(
            &tmp,
            r"
repos:
  - repo: ./shared-hooks
    rev: v1
    hooks:
      - id: trailing-whitespace
        files: false
        exclude: false
",
        )
        .await
        .unwrap();
        let hook = &resolved.hooks[0];
        assert!(hook.filter.matches("fix.patch"));
        assert!(hook.filter.matches("main.rs"));
    }

    #[tokio::test]
    async fn test_entry_pin_beats_manifest_default() {
        let tmp = project();
        let resolved = resolve(
            &tmp,
            r"
default_language_version: { system: '2.0' }
default_stages: [pre-commit]
repos:
  - repo: local
    hooks:
      - id: pinned
        entry: tool
        language: system
        language_version: '3.0'
  - repo: ./shared-hooks
    rev: v1
    hooks:
      - id: trailing-whitespace
        stages: [manual]
",
        )
        .await
        .unwrap();
        assert_eq!(resolved.hooks[0].language_version, "3.0");
        assert!(resolved.hooks[0].runs_in_stage("pre-commit"));
        assert!(!resolved.hooks[0].runs_in_stage("pre-push"));
        assert_eq!(resolved.hooks[1].language_version, "default");
        assert!(resolved.hooks[1].runs_in_stage("manual"));
        assert!(!resolved.hooks[1].runs_in_stage("pre-commit"));
    }

    #[tokio::test]
    async fn test_local_pin_selects_its_own_environment() {
        let tmp = project();
        let resolved = resolve(
            &tmp,
            r"
default_language_version: { system: '2.0' }
repos:
  - repo: local
    hooks:
      - id: pinned
        entry: tool
        language: system
        language_version: '3.0'
      - id: unpinned
        entry: tool
        language: system
  - repo: ./shared-hooks
    rev: v1
    hooks:
      - id: lint
        language_version: '4.0'
",
        )
        .await
        .unwrap();

        let pinned = &resolved.hooks[0];
        let unpinned = &resolved.hooks[1];
        assert_eq!(pinned.language_version, "3.0");
        assert_eq!(unpinned.language_version, "2.0");
        assert_eq!(pinned.environment_key().language_version, "3.0");
        assert_ne!(pinned.environment_key(), unpinned.environment_key());
        // Entry pin also beats the published definition's own pin
        assert_eq!(resolved.hooks[2].language_version, "4.0");
    }

    #[tokio::test]
    async fn test_every_problem_is_reported_at_once() {
        let tmp = project();
        let err = resolve(
            &tmp,
            r"
max_file_size: -1
files: '(unclosed'
repos:
  - repo: local
    hooks:
      - id: dup
        entry: a
        language: system
      - id: dup
        entry: b
        language: system
      - id: no-entry
        language: system
      - id: bad-timeout
        entry: x
        language: system
        timeout: -5
  - repo: ./shared-hooks
    hooks:
      - id: not-published
  - repo: https://example.com/hooks
    rev: v1
    hooks:
      - id: whatever
",
        )
        .await
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("max_file_size must be non-negative"));
        assert!(message.contains("invalid files pattern '(unclosed'"));
        assert!(message.contains("repos[0].hooks[1] 'dup': duplicate hook id"));
        assert!(message.contains("repos[0].hooks[2] 'no-entry': missing entry"));
        assert!(message.contains("repos[0].hooks[3] 'bad-timeout': timeout must be non-negative"));
        assert!(message.contains("missing rev"));
        assert!(message.contains("'not-published' not found"));
        assert!(message.contains("reference it by path"));
    }

    #[tokio::test]
    async fn test_alias_makes_duplicate_ids_distinct() {
        let tmp = project();
        let resolved = resolve(
            &tmp,
            r"
repos:
  - repo: ./shared-hooks
    rev: v1
    hooks:
      - id: lint
      - id: lint
        alias: lint-again
",
        )
        .await
        .unwrap();
        assert_eq!(resolved.hooks[0].id, "lint");
        assert_eq!(resolved.hooks[1].id, "lint-again");
        assert_eq!(
            resolved.hooks[0].environment_key(),
            resolved.hooks[1].environment_key()
        );
    }

    #[tokio::test]
    async fn test_language_override_needs_local_source() {
        let tmp = project();
        let err = resolve(
            &tmp,
            r"
repos:
  - repo: ./shared-hooks
    rev: v1
    hooks:
      - id: lint
        language: script
",
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("language can only be set on local hooks"));
    }

    #[tokio::test]
    async fn test_true_is_not_a_pattern() {
        let tmp = project();
        let err = resolve(
            &tmp,
            "repos:\n  - repo: local\n    hooks:\n      - id: x\n        entry: x\n        language: system\n        files: true\n",
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not true"));
    }
}
