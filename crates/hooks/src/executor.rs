//! Running one hook: command construction, batching and process control

use crate::environment::Environment;
use crate::manifest::ResolvedHook;
use crate::types::{HookStatus, Outcome};
use hookrun_events::emit_hook_batch;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Split `files` into batches whose command line stays within `max_bytes`.
///
/// `base_len` is the size of the fixed part (program and arguments). Every
/// batch holds at least one file, so a single oversized path still runs.
#[must_use]
pub fn partition<'a>(base_len: usize, files: &'a [String], max_bytes: usize) -> Vec<&'a [String]> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut size = base_len;

    for (i, file) in files.iter().enumerate() {
        let cost = file.len() + 1;
        if i > start && size + cost > max_bytes {
            batches.push(&files[start..i]);
            start = i;
            size = base_len;
        }
        size += cost;
    }
    if start < files.len() {
        batches.push(&files[start..]);
    }
    batches
}

fn command_len(argv: &[String]) -> usize {
    argv.iter().map(|a| a.len() + 1).sum()
}

/// How one invocation ended.
#[derive(Debug)]
enum Ending {
    Exited(ExitStatus),
    TimedOut(Duration),
    Cancelled,
    SpawnFailed(String),
}

#[derive(Debug)]
struct Invocation {
    ending: Ending,
    stdout: String,
    stderr: String,
}

/// Runs resolved hooks as child processes.
#[derive(Debug, Clone)]
pub struct HookExecutor {
    project_root: PathBuf,
    max_command_bytes: usize,
}

impl HookExecutor {
    /// Executor running hooks from `project_root`.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>, max_command_bytes: usize) -> Self {
        Self {
            project_root: project_root.into(),
            max_command_bytes,
        }
    }

    /// Directory hooks run in
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Program and fixed arguments for a hook in its environment.
    #[must_use]
    pub fn base_command(&self, hook: &ResolvedHook, env: &Environment) -> Vec<String> {
        let mut argv = hook.command.clone();
        if let Some(root) = &env.activation.entry_root
            && let Some(program) = argv.first_mut()
            && is_relative_script(program)
        {
            *program = root.join(program.as_str()).to_string_lossy().into_owned();
        }
        argv.extend(hook.args.iter().cloned());
        argv
    }

    /// Execute `hook` over `files` and record the outcome.
    ///
    /// With `pass_filenames` off the hook runs exactly once without file
    /// arguments; otherwise once per batch. Any failing batch fails the hook;
    /// a timeout, cancellation or spawn error makes it `errored` and stops
    /// further batches.
    pub async fn execute(
        &self,
        hook: &ResolvedHook,
        env: &Environment,
        files: &[String],
        cancel: &CancellationToken,
    ) -> Outcome {
        let started = Instant::now();
        let base = self.base_command(hook, env);

        let batches: Vec<&[String]> = if hook.pass_filenames && !files.is_empty() {
            partition(command_len(&base), files, self.max_command_bytes)
        } else {
            vec![&files[..0]]
        };
        let total = batches.len();

        let before = fingerprint(&self.project_root, files).await;

        let mut status = HookStatus::Passed;
        let mut exit_code = None;
        let mut reason = None;
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut ran = 0;

        for (i, batch) in batches.into_iter().enumerate() {
            emit_hook_batch!(hook.id, i + 1, total, batch.len());
            let mut argv = base.clone();
            argv.extend(batch.iter().cloned());

            let invocation = self.invoke(&argv, env, hook.timeout, cancel).await;
            ran += 1;
            stdout.push_str(&invocation.stdout);
            stderr.push_str(&invocation.stderr);

            match invocation.ending {
                Ending::Exited(exit) if exit.success() => {
                    if status == HookStatus::Passed {
                        exit_code = exit.code();
                    }
                }
                Ending::Exited(exit) => {
                    if status == HookStatus::Passed {
                        status = HookStatus::Failed;
                        exit_code = exit.code();
                        if exit.code().is_none() {
                            reason = Some(format!("terminated by signal ({exit})"));
                        }
                    }
                }
                Ending::TimedOut(after) => {
                    status = HookStatus::Errored;
                    reason = Some(format!("timed out after {}s", after.as_secs()));
                    break;
                }
                Ending::Cancelled => {
                    status = HookStatus::Errored;
                    reason = Some("cancelled".to_string());
                    break;
                }
                Ending::SpawnFailed(message) => {
                    status = HookStatus::Errored;
                    reason = Some(message);
                    break;
                }
            }
        }

        let after = fingerprint(&self.project_root, files).await;
        let files_modified = before != after;
        if files_modified {
            debug!(hook = %hook.id, "Hook modified files");
        }

        Outcome {
            index: hook.index,
            id: hook.id.clone(),
            name: hook.name.clone(),
            status,
            exit_code,
            stdout,
            stderr,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            files_modified,
            batches: ran,
            file_count: files.len(),
            reason,
            verbose: hook.verbose,
        }
    }

    async fn invoke(
        &self,
        argv: &[String],
        env: &Environment,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Invocation {
        let Some((program, args)) = argv.split_first() else {
            return spawn_failure("empty command line".to_string());
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&self.project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        apply_activation(&mut cmd, &env.activation.path_prefix, &env.activation.env);

        // Own process group, so a timeout takes down grandchildren too
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        debug!(command = %display_command(argv), "Spawning hook process");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return spawn_failure(format!("failed to run '{program}': {e}")),
        };

        let stdout_task = tokio::spawn(read_output(child.stdout.take()));
        let stderr_task = tokio::spawn(read_output(child.stderr.take()));

        let ending = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Ending::Exited(status),
                Err(e) => Ending::SpawnFailed(format!("failed to wait for '{program}': {e}")),
            },
            () = tokio::time::sleep(timeout) => {
                warn!(program = %program, seconds = timeout.as_secs(), "Hook timed out");
                terminate(&mut child).await;
                Ending::TimedOut(timeout)
            }
            () = cancel.cancelled() => {
                terminate(&mut child).await;
                Ending::Cancelled
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        Invocation {
            ending,
            stdout,
            stderr,
        }
    }
}

fn spawn_failure(message: String) -> Invocation {
    Invocation {
        ending: Ending::SpawnFailed(message),
        stdout: String::new(),
        stderr: String::new(),
    }
}

fn is_relative_script(program: &str) -> bool {
    let path = Path::new(program);
    program.starts_with("./")
        || program.starts_with("../")
        || (path.is_relative() && path.components().count() > 1)
}

fn apply_activation(cmd: &mut Command, path_prefix: &[PathBuf], env: &BTreeMap<String, String>) {
    if !path_prefix.is_empty() {
        let existing = std::env::var_os("PATH").unwrap_or_default();
        let mut paths: Vec<PathBuf> = path_prefix.to_vec();
        paths.extend(std::env::split_paths(&existing));
        if let Ok(joined) = std::env::join_paths(paths) {
            cmd.env("PATH", joined);
        }
    }
    for (key, value) in env {
        cmd.env(key, value);
    }
}

/// Drain a child stream to the end; invalid UTF-8 is replaced, never truncated.
async fn read_output<R>(stream: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    if let Some(mut stream) = stream
        && let Err(e) = stream.read_to_end(&mut bytes).await
    {
        debug!(error = %e, "Failed to read hook output");
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Kill the child's whole process group, then reap the child.
#[allow(unsafe_code)]
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id().and_then(|id| libc::pid_t::try_from(id).ok()) {
            // SAFETY: killpg only sends a signal; the group was created for this child
            unsafe {
                libc::killpg(pid, libc::SIGKILL);
            }
        }
    }
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Child already gone");
    }
}

/// SHA-256 of every file's contents, `None` for unreadable files.
async fn fingerprint(root: &Path, files: &[String]) -> Vec<Option<String>> {
    let mut prints = Vec::with_capacity(files.len());
    for file in files {
        let digest = tokio::fs::read(root.join(file))
            .await
            .ok()
            .map(|bytes| hex::encode(Sha256::digest(bytes)));
        prints.push(digest);
    }
    prints
}

/// Render an argv for logs.
#[must_use]
pub fn display_command(argv: &[String]) -> String {
    shlex::try_join(argv.iter().map(String::as_str))
        .unwrap_or_else(|_| argv.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{local_hook, strings as files, system_environment as environment};
    use tempfile::TempDir;

    fn hook(entry: &[&str], pass_filenames: bool, timeout: Duration) -> ResolvedHook {
        let mut hook = local_hook(0, "test", entry);
        hook.pass_filenames = pass_filenames;
        hook.timeout = timeout;
        hook
    }

    #[test]
    fn test_partition_respects_budget() {
        let files = files(&["aaaa", "bbbb", "cccc", "dddd"]);
        // base 10, each file costs 5
        let batches = partition(10, &files, 20);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], &files[0..2]);
        assert_eq!(batches[1], &files[2..4]);
    }

    #[test]
    fn test_partition_oversized_file_gets_own_batch() {
        let files = files(&["a", "a-very-long-file-name", "b"]);
        let batches = partition(0, &files, 5);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), 3);
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition(0, &[], 100).is_empty());
    }

    #[test]
    fn test_script_entries_resolve_against_source_root() {
        let executor = HookExecutor::new("/project", 1024);
        let mut env = environment();
        env.activation.entry_root = Some(PathBuf::from("/src/hooks"));

        let mut h = hook(&["./check.sh", "--fix"], true, Duration::from_secs(5));
        h.args = vec!["-v".to_string()];
        assert_eq!(
            executor.base_command(&h, &env),
            vec!["/src/hooks/./check.sh", "--fix", "-v"]
        );

        let h = hook(&["bash", "-c", "true"], true, Duration::from_secs(5));
        assert_eq!(executor.base_command(&h, &env)[0], "bash");
    }

    #[test]
    fn test_display_command_round_trips_through_shlex() {
        let argv = files(&["sh", "-c", "exit 1"]);
        let shown = display_command(&argv);
        assert_eq!(shlex::split(&shown).unwrap(), argv);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_passing_hook_receives_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "a").unwrap();
        let executor = HookExecutor::new(tmp.path(), 4096);

        let outcome = executor
            .execute(
                &hook(&["echo"], true, Duration::from_secs(10)),
                &environment(),
                &files(&["a.txt"]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.status, HookStatus::Passed);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.stdout, "a.txt\n");
        assert_eq!(outcome.batches, 1);
        assert!(!outcome.files_modified);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_batch_fails_hook() {
        let tmp = TempDir::new().unwrap();
        for name in ["ok.txt", "bad.txt", "ok2.txt"] {
            std::fs::write(tmp.path().join(name), name).unwrap();
        }
        // One file per batch; only the batch containing bad.txt fails
        let executor = HookExecutor::new(tmp.path(), 1);
        let script = r#"for f in "$@"; do [ "$f" = bad.txt ] && exit 3; done; exit 0"#;

        let outcome = executor
            .execute(
                &hook(&["sh", "-c", script, "sh"], true, Duration::from_secs(10)),
                &environment(),
                &files(&["ok.txt", "bad.txt", "ok2.txt"]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.status, HookStatus::Failed);
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.batches, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pass_filenames_false_runs_once_without_files() {
        let tmp = TempDir::new().unwrap();
        let executor = HookExecutor::new(tmp.path(), 1);
        let names: Vec<String> = (0..50).map(|i| format!("f{i}.txt")).collect();

        let outcome = executor
            .execute(
                &hook(&["sh", "-c", "echo $#", "sh"], false, Duration::from_secs(10)),
                &environment(),
                &names,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.batches, 1);
        assert_eq!(outcome.stdout, "0\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process_group_and_errors() {
        let tmp = TempDir::new().unwrap();
        let executor = HookExecutor::new(tmp.path(), 4096);
        let started = Instant::now();

        let outcome = executor
            .execute(
                &hook(&["sh", "-c", "sleep 30 & sleep 30"], false, Duration::from_millis(200)),
                &environment(),
                &[],
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.status, HookStatus::Errored);
        assert!(outcome.reason.unwrap().starts_with("timed out after"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_errors_with_reason() {
        let tmp = TempDir::new().unwrap();
        let executor = HookExecutor::new(tmp.path(), 4096);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let outcome = executor
            .execute(
                &hook(&["sleep", "30"], false, Duration::from_secs(60)),
                &environment(),
                &[],
                &cancel,
            )
            .await;

        assert_eq!(outcome.status, HookStatus::Errored);
        assert_eq!(outcome.reason.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_missing_program_errors() {
        let tmp = TempDir::new().unwrap();
        let executor = HookExecutor::new(tmp.path(), 4096);
        let outcome = executor
            .execute(
                &hook(&["definitely-not-a-real-program-xyz"], false, Duration::from_secs(5)),
                &environment(),
                &[],
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(outcome.status, HookStatus::Errored);
        assert!(outcome.reason.unwrap().contains("failed to run"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invalid_utf8_output_is_kept_and_fully_drained() {
        let tmp = TempDir::new().unwrap();
        let executor = HookExecutor::new(tmp.path(), 4096);
        // Enough output after the bad byte to fill the pipe if reading stopped
        let script = r"printf '\377\nafter\n'; i=0; while [ $i -lt 40000 ]; do echo line; i=$((i+1)); done; exit 0";

        let outcome = executor
            .execute(
                &hook(&["sh", "-c", script], false, Duration::from_secs(60)),
                &environment(),
                &[],
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.status, HookStatus::Passed, "{:?}", outcome.reason);
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.stdout.starts_with("\u{FFFD}\nafter\n"));
        assert_eq!(outcome.stdout.lines().filter(|l| *l == "line").count(), 40000);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_modification_is_detected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "before").unwrap();
        let executor = HookExecutor::new(tmp.path(), 4096);

        let outcome = executor
            .execute(
                &hook(
                    &["sh", "-c", r#"for f in "$@"; do echo fixed > "$f"; done"#, "sh"],
                    true,
                    Duration::from_secs(10),
                ),
                &environment(),
                &files(&["a.txt"]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.status, HookStatus::Passed);
        assert!(outcome.files_modified);
    }
}
