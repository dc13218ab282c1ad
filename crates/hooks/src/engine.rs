//! Run orchestration
//!
//! [`Engine`] drives one run end to end: load and resolve the manifest,
//! select files, plan, schedule and aggregate.

use crate::Result;
use crate::config::RunConfig;
use crate::environment::{EnvironmentCache, InstallerRegistry};
use crate::executor::HookExecutor;
use crate::manifest::{Manifest, ResolvedManifest};
use crate::report::{AggregationPolicy, RunReport};
use crate::scheduler::{PlannedAction, PlannedHook, Scheduler};
use crate::selector::{FileSelector, FileSet, Selection};
use crate::source::SourceRegistry;
use hookrun_cache::EnvironmentStore;
use hookrun_events::{emit_run_completed, emit_run_started};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Reason recorded for hooks named in the skip list.
pub const SKIP_LIST_REASON: &str = "listed in SKIP";
/// Reason recorded for hooks with no matching files.
pub const NO_FILES_REASON: &str = "no files to check";

/// Entry point for validating and running manifests in one project.
#[derive(Debug)]
pub struct Engine {
    project_root: PathBuf,
    sources: SourceRegistry,
    environments: Arc<EnvironmentCache>,
    config: RunConfig,
}

impl Engine {
    /// Engine with the built-in hook sources and installers.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>, store: EnvironmentStore, config: RunConfig) -> Self {
        Self::with_registries(
            project_root,
            SourceRegistry::with_defaults(),
            EnvironmentCache::new(store, InstallerRegistry::with_defaults()),
            config,
        )
    }

    /// Engine with caller-supplied sources and environment cache.
    #[must_use]
    pub fn with_registries(
        project_root: impl Into<PathBuf>,
        sources: SourceRegistry,
        environments: EnvironmentCache,
        config: RunConfig,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            sources,
            environments: Arc::new(environments),
            config,
        }
    }

    /// Load the manifest at `path` and resolve it completely.
    pub async fn load(&self, path: &Path) -> Result<ResolvedManifest> {
        let manifest = Manifest::load(path)?;
        let resolved = manifest.resolve(&self.sources, &self.project_root).await?;
        debug!(path = %path.display(), hooks = resolved.hooks.len(), "Manifest resolved");
        Ok(resolved)
    }

    /// Decide what happens to each hook, in declaration order.
    ///
    /// Hooks outside the selected stage or `--hook` list are left out of the
    /// plan. Hooks in the skip list, and hooks with nothing to check, stay in
    /// the plan as skips.
    #[must_use]
    pub fn plan(&self, manifest: &ResolvedManifest, files: &FileSet) -> Vec<PlannedHook> {
        let selector = FileSelector::new(files);
        manifest
            .hooks
            .iter()
            .filter(|hook| {
                self.config
                    .stage
                    .as_deref()
                    .is_none_or(|stage| hook.runs_in_stage(stage))
            })
            .filter(|hook| self.config.is_selected(&hook.hook_id, hook.alias.as_deref()))
            .map(|hook| {
                let action = if self.config.is_skipped(&hook.hook_id, hook.alias.as_deref()) {
                    PlannedAction::Skip(SKIP_LIST_REASON.to_string())
                } else {
                    match selector.select(hook) {
                        Selection::Run(files) => PlannedAction::Run(files),
                        Selection::Skip => PlannedAction::Skip(NO_FILES_REASON.to_string()),
                    }
                };
                let mut hook = hook.clone();
                hook.verbose |= self.config.verbose;
                PlannedHook {
                    hook: Arc::new(hook),
                    action,
                }
            })
            .collect()
    }

    /// Run a resolved manifest against the candidate files.
    #[instrument(name = "run", skip_all, fields(root = %self.project_root.display()))]
    pub async fn run<I, S>(
        &self,
        manifest: &ResolvedManifest,
        candidates: I,
        cancel: &CancellationToken,
    ) -> Result<RunReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let started = Instant::now();
        let files = FileSet::prepare(
            &self.project_root,
            candidates,
            &manifest.global_filter,
            manifest.max_file_size,
        );
        let plan = self.plan(manifest, &files);
        let expected: Vec<usize> = plan.iter().map(|p| p.hook.index).collect();
        emit_run_started!(plan.len(), files.len());

        let executor = Arc::new(HookExecutor::new(
            self.project_root.clone(),
            self.config.max_command_bytes,
        ));
        let scheduler = Scheduler::new(
            executor,
            Arc::clone(&self.environments),
            self.config.effective_jobs(),
            manifest.fail_fast,
        );
        let outcomes = scheduler.run(plan, cancel).await?;

        let report = RunReport::aggregate(
            outcomes,
            &expected,
            AggregationPolicy {
                fail_on_modified: manifest.fail_on_modified,
                cancelled: cancel.is_cancelled(),
            },
        )?;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            passed = report.counts.passed,
            failed = report.counts.failed,
            errored = report.counts.errored,
            skipped = report.counts.skipped,
            "Run finished"
        );
        emit_run_completed!(report.passed(), report.exit_code, duration_ms);
        Ok(report)
    }

    /// Load the manifest at `path` and run it.
    ///
    /// An invalid manifest fails before any hook starts.
    pub async fn run_manifest<I, S>(
        &self,
        path: &Path,
        candidates: I,
        cancel: &CancellationToken,
    ) -> Result<RunReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let manifest = self.load(path).await?;
        self.run(&manifest, candidates, cancel).await
    }
}
