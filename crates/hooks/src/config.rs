//! Per-run execution settings

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Per-invocation timeout when neither the hook nor the manifest sets one.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Upper bound for one command line (program, args and file batch).
///
/// Kept well below common `ARG_MAX` values since the environment block
/// shares the same limit.
pub const DEFAULT_MAX_COMMAND_BYTES: usize = 96 * 1024;

/// Settings for one run, supplied by the caller rather than the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    /// Maximum number of hooks running at once
    pub jobs: usize,
    /// Command-line budget used to split file lists into batches
    pub max_command_bytes: usize,
    /// Only run hooks registered for this stage
    pub stage: Option<String>,
    /// Only run these hooks (ids or aliases); all when empty
    pub hook_ids: Vec<String>,
    /// Hooks (ids or aliases) recorded as skipped without running
    pub skip: Vec<String>,
    /// Show captured output of every hook
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            max_command_bytes: DEFAULT_MAX_COMMAND_BYTES,
            stage: None,
            hook_ids: Vec::new(),
            skip: Vec::new(),
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Effective worker limit, never below one.
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        self.jobs.max(1)
    }

    /// Whether `id` or `alias` appears in the skip list.
    #[must_use]
    pub fn is_skipped(&self, id: &str, alias: Option<&str>) -> bool {
        self.skip
            .iter()
            .any(|s| s == id || alias.is_some_and(|a| a == s))
    }

    /// Whether the `--hook` selection includes this hook.
    #[must_use]
    pub fn is_selected(&self, id: &str, alias: Option<&str>) -> bool {
        self.hook_ids.is_empty()
            || self
                .hook_ids
                .iter()
                .any(|h| h == id || alias.is_some_and(|a| a == h))
    }
}

/// Number of available processing units, or one when unknown.
#[must_use]
pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Split a comma-separated hook list (the `SKIP` variable format).
#[must_use]
pub fn parse_hook_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
