//! Execution scheduler
//!
//! Hooks are admitted strictly in declaration order. The hook at the head
//! of the queue starts as soon as a worker slot is free and it does not
//! conflict with anything running; until then, later hooks wait behind it.
//! Two hooks conflict when either requires serial execution, or when one
//! rewrites files and their file subsets overlap.

use crate::{Error, Result};
use crate::environment::EnvironmentCache;
use crate::executor::HookExecutor;
use crate::manifest::ResolvedHook;
use crate::types::Outcome;
use hookrun_events::{emit_cancelled, emit_hook_completed, emit_hook_skipped, emit_hook_started};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Reason recorded for hooks not started after a fail-fast failure.
pub const FAIL_FAST_REASON: &str = "fail fast";
/// Reason recorded for hooks not started after cancellation.
pub const CANCELLED_REASON: &str = "run cancelled";

/// What the scheduler does with a planned hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    /// Execute with these files
    Run(Vec<String>),
    /// Record as skipped without executing
    Skip(String),
}

/// A hook selected for this run.
#[derive(Debug, Clone)]
pub struct PlannedHook {
    /// The hook
    pub hook: Arc<ResolvedHook>,
    /// What to do with it
    pub action: PlannedAction,
}

/// Bookkeeping for a hook in flight.
#[derive(Debug)]
struct Running {
    serial: bool,
    modifies: bool,
    fail_fast: bool,
    files: HashSet<String>,
}

impl Running {
    fn conflicts_with(&self, hook: &ResolvedHook, files: &[String]) -> bool {
        if self.serial || hook.require_serial {
            return true;
        }
        (self.modifies || hook.modifies_files) && files.iter().any(|f| self.files.contains(f))
    }
}

/// Runs planned hooks with bounded parallelism.
#[derive(Debug, Clone)]
pub struct Scheduler {
    executor: Arc<HookExecutor>,
    environments: Arc<EnvironmentCache>,
    jobs: usize,
    fail_fast: bool,
}

impl Scheduler {
    /// Scheduler running at most `jobs` hooks at once.
    #[must_use]
    pub fn new(
        executor: Arc<HookExecutor>,
        environments: Arc<EnvironmentCache>,
        jobs: usize,
        fail_fast: bool,
    ) -> Self {
        Self {
            executor,
            environments,
            jobs: jobs.max(1),
            fail_fast,
        }
    }

    /// Run the plan and return one outcome per planned hook, in completion
    /// order.
    ///
    /// Hook failures never abort the run; only a crashed hook task does.
    #[instrument(name = "schedule", skip_all, fields(hooks = plan.len(), jobs = self.jobs))]
    pub async fn run(
        &self,
        plan: Vec<PlannedHook>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::with_capacity(plan.len());
        let mut pending: VecDeque<PlannedHook> = plan.into();
        let mut running: HashMap<usize, Running> = HashMap::new();
        let mut tasks = JoinSet::new();
        let mut halted: Option<&'static str> = None;

        loop {
            // Admit from the head of the queue
            while let Some(next) = pending.front() {
                if halted.is_none() && cancel.is_cancelled() {
                    emit_cancelled!("interrupted");
                    halted = Some(CANCELLED_REASON);
                }
                if halted.is_some() {
                    break;
                }

                if let PlannedAction::Run(files) = &next.action {
                    if tasks.len() >= self.jobs
                        || running
                            .values()
                            .any(|r| r.conflicts_with(&next.hook, files))
                    {
                        break;
                    }
                }

                let Some(planned) = pending.pop_front() else {
                    break;
                };
                let hook = planned.hook;
                match planned.action {
                    PlannedAction::Skip(reason) => {
                        outcomes.push(skip(&hook, reason));
                    }
                    PlannedAction::Run(files) => {
                        running.insert(
                            hook.index,
                            Running {
                                serial: hook.require_serial,
                                modifies: hook.modifies_files,
                                fail_fast: hook.fail_fast,
                                files: files.iter().cloned().collect(),
                            },
                        );
                        debug!(hook = %hook.id, running = running.len(), "Starting hook");
                        let executor = Arc::clone(&self.executor);
                        let environments = Arc::clone(&self.environments);
                        let cancel = cancel.clone();
                        tasks.spawn(async move {
                            run_hook(&executor, &environments, &hook, &files, &cancel).await
                        });
                    }
                }
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let outcome =
                joined.map_err(|e| Error::aggregation(format!("hook task failed: {e}")))?;
            let hook_fail_fast = running
                .remove(&outcome.index)
                .is_some_and(|r| r.fail_fast);

            emit_hook_completed!(
                outcome.id,
                outcome.status,
                outcome.exit_code,
                outcome.duration_ms,
                outcome.files_modified
            );

            if halted.is_none() && outcome.status.is_failure() && (self.fail_fast || hook_fail_fast)
            {
                debug!(hook = %outcome.id, "Fail fast triggered");
                halted = Some(FAIL_FAST_REASON);
            }
            outcomes.push(outcome);
        }

        let reason = halted.unwrap_or(CANCELLED_REASON);
        for planned in pending {
            let why = match planned.action {
                PlannedAction::Skip(own) => own,
                PlannedAction::Run(_) => reason.to_string(),
            };
            outcomes.push(skip(&planned.hook, why));
        }

        Ok(outcomes)
    }
}

fn skip(hook: &ResolvedHook, reason: String) -> Outcome {
    emit_hook_skipped!(hook.id, reason);
    let mut outcome = Outcome::skipped(hook.index, &hook.id, &hook.name, reason);
    outcome.verbose = hook.verbose;
    outcome
}

async fn run_hook(
    executor: &HookExecutor,
    environments: &EnvironmentCache,
    hook: &ResolvedHook,
    files: &[String],
    cancel: &CancellationToken,
) -> Outcome {
    emit_hook_started!(hook.id, hook.name, files.len());

    let key = hook.environment_key();
    let env = match environments.get(&key, &hook.source.root, cancel).await {
        Ok(env) => env,
        Err(Error::Cancelled) => {
            return Outcome::errored(hook.index, &hook.id, &hook.name, "cancelled");
        }
        Err(e) => {
            let mut outcome = Outcome::errored(hook.index, &hook.id, &hook.name, e.to_string());
            outcome.file_count = files.len();
            return outcome;
        }
    };

    executor.execute(hook, &env, files, cancel).await
}
