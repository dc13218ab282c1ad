//! File selection: which candidate paths each hook sees
//!
//! Candidates from the changeset are normalized once per run into a
//! [`FileSet`]; each hook then takes the subset its own filter accepts.
//! Excludes always win over includes.

use crate::manifest::ResolvedHook;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Include/exclude filter over relative, forward-slash paths.
///
/// Patterns use search semantics: `\.py$` matches `src/app.py`.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    include: Option<Regex>,
    excludes: Vec<Regex>,
}

impl FileFilter {
    /// Build a filter; no include means every path is included.
    #[must_use]
    pub fn new(include: Option<Regex>, excludes: Vec<Regex>) -> Self {
        Self { include, excludes }
    }

    /// Whether the filter accepts `path`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        if self.excludes.iter().any(|re| re.is_match(path)) {
            return false;
        }
        self.include.as_ref().is_none_or(|re| re.is_match(path))
    }
}

/// Normalize a changeset path: forward slashes, no leading `./`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut trimmed = unified.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}

/// Candidate files of one run, after global filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<String>,
}

impl FileSet {
    /// Prepare the candidate list.
    ///
    /// In order: normalize and de-duplicate (first occurrence wins), drop
    /// paths that are not regular files under `root`, drop files larger than
    /// `max_file_size`, then apply the global filter.
    #[must_use]
    pub fn prepare<I, S>(
        root: &Path,
        candidates: I,
        global: &FileFilter,
        max_file_size: Option<u64>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for candidate in candidates {
            let path = normalize_path(candidate.as_ref());
            if path.is_empty() || !seen.insert(path.clone()) {
                continue;
            }

            let Ok(metadata) = std::fs::metadata(root.join(&path)) else {
                debug!(path = %path, "Dropping candidate that does not exist");
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            if let Some(limit) = max_file_size
                && metadata.len() > limit
            {
                debug!(path = %path, size = metadata.len(), limit, "Dropping oversized file");
                continue;
            }
            if !global.matches(&path) {
                continue;
            }
            files.push(path);
        }

        Self { files }
    }

    #[cfg(test)]
    pub(crate) fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Candidate paths in changeset order.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether there are no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// What a hook gets to work on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Execute with these files (possibly none, for `always_run` hooks)
    Run(Vec<String>),
    /// Nothing to check; record the hook as skipped
    Skip,
}

/// Computes per-hook file subsets from a [`FileSet`].
#[derive(Debug, Clone, Copy)]
pub struct FileSelector<'a> {
    files: &'a FileSet,
}

impl<'a> FileSelector<'a> {
    /// Selector over `files`
    #[must_use]
    pub fn new(files: &'a FileSet) -> Self {
        Self { files }
    }

    /// Select the files for a hook.
    #[must_use]
    pub fn select(&self, hook: &ResolvedHook) -> Selection {
        self.select_with(&hook.filter, hook.always_run)
    }

    /// Select with an explicit filter and `always_run` flag.
    #[must_use]
    pub fn select_with(&self, filter: &FileFilter, always_run: bool) -> Selection {
        let subset: Vec<String> = self
            .files
            .files()
            .iter()
            .filter(|path| filter.matches(path))
            .cloned()
            .collect();

        if subset.is_empty() && !always_run {
            Selection::Skip
        } else {
            Selection::Run(subset)
        }
    }
}
