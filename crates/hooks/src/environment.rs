//! Hook environments and the single-flight environment cache
//!
//! Hooks sharing an [`EnvironmentKey`] share one [`Environment`]. Within a
//! run the cache hands every caller the same `Arc`, building at most once
//! per key; across runs the prepared directory is reused from the
//! persistent [`EnvironmentStore`].

use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use hookrun_cache::{
    EnvironmentKeyEnvelope, EnvironmentRecord, EnvironmentStore, compute_environment_key,
};
use hookrun_events::{emit_environment_building, emit_environment_failed, emit_environment_ready};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Identity of an environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentKey {
    /// Hook source identity
    pub source: String,
    /// Source revision
    pub revision: String,
    /// Installer language
    pub language: String,
    /// Runtime version
    pub language_version: String,
    /// Extra dependencies, sorted and de-duplicated
    pub dependencies: Vec<String>,
}

impl EnvironmentKey {
    /// Build a key; dependency order does not matter.
    #[must_use]
    pub fn new(
        source: &str,
        revision: &str,
        language: &str,
        language_version: &str,
        mut dependencies: Vec<String>,
    ) -> Self {
        dependencies.sort();
        dependencies.dedup();
        Self {
            source: source.to_string(),
            revision: revision.to_string(),
            language: language.to_string(),
            language_version: language_version.to_string(),
            dependencies,
        }
    }

    /// Content hash used as the on-disk key, plus the hashed envelope.
    pub fn digest(&self) -> Result<(String, serde_json::Value)> {
        let envelope = EnvironmentKeyEnvelope::new(
            &self.source,
            &self.revision,
            &self.language,
            &self.language_version,
            self.dependencies.clone(),
        );
        Ok(compute_environment_key(&envelope)?)
    }
}

/// How to run commands inside an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    /// Directories prepended to `PATH`
    pub path_prefix: Vec<PathBuf>,
    /// Extra environment variables
    pub env: BTreeMap<String, String>,
    /// Relative entry programs are resolved against this directory
    pub entry_root: Option<PathBuf>,
}

/// A prepared environment.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key it was built for
    pub key: EnvironmentKey,
    /// Content hash of the key
    pub digest: String,
    /// Directory holding the environment
    pub path: PathBuf,
    /// Runtime settings for invocations
    pub activation: Activation,
}

/// What an installer is asked to prepare.
#[derive(Debug, Clone, Copy)]
pub struct InstallRequest<'a> {
    /// Environment identity
    pub key: &'a EnvironmentKey,
    /// Empty directory the environment lives in
    pub env_dir: &'a Path,
    /// Root of the hook source
    pub source_root: &'a Path,
}

/// Prepares environments for one language.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Language this installer handles
    fn language(&self) -> &'static str;

    /// Populate `request.env_dir`.
    async fn install(&self, request: InstallRequest<'_>) -> Result<()>;

    /// Runtime settings of a prepared environment (fresh or reused).
    fn activate(&self, request: InstallRequest<'_>) -> Activation;
}

fn reject_dependencies(language: &str, key: &EnvironmentKey) -> Result<()> {
    if key.dependencies.is_empty() {
        Ok(())
    } else {
        Err(Error::environment(
            &key.source,
            format!(
                "language '{language}' does not support additional_dependencies ({})",
                key.dependencies.join(", ")
            ),
        ))
    }
}

/// Commands come straight from `PATH`; nothing to install.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInstaller;

#[async_trait]
impl Installer for SystemInstaller {
    fn language(&self) -> &'static str {
        "system"
    }

    async fn install(&self, request: InstallRequest<'_>) -> Result<()> {
        reject_dependencies(self.language(), request.key)
    }

    fn activate(&self, _request: InstallRequest<'_>) -> Activation {
        Activation::default()
    }
}

/// Entry is a script shipped with the hook source.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptInstaller;

#[async_trait]
impl Installer for ScriptInstaller {
    fn language(&self) -> &'static str {
        "script"
    }

    async fn install(&self, request: InstallRequest<'_>) -> Result<()> {
        reject_dependencies(self.language(), request.key)
    }

    fn activate(&self, request: InstallRequest<'_>) -> Activation {
        Activation {
            entry_root: Some(request.source_root.to_path_buf()),
            ..Activation::default()
        }
    }
}

/// Installers by language.
#[derive(Clone)]
pub struct InstallerRegistry {
    installers: HashMap<String, Arc<dyn Installer>>,
}

impl std::fmt::Debug for InstallerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut languages: Vec<_> = self.installers.keys().collect();
        languages.sort();
        f.debug_struct("InstallerRegistry")
            .field("languages", &languages)
            .finish()
    }
}

impl Default for InstallerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl InstallerRegistry {
    /// Registry without installers
    #[must_use]
    pub fn empty() -> Self {
        Self {
            installers: HashMap::new(),
        }
    }

    /// Registry with `system` and `script`
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(SystemInstaller));
        registry.register(Arc::new(ScriptInstaller));
        registry
    }

    /// Add or replace the installer for its language
    pub fn register(&mut self, installer: Arc<dyn Installer>) {
        self.installers
            .insert(installer.language().to_string(), installer);
    }

    /// Installer for `language`
    #[must_use]
    pub fn get(&self, language: &str) -> Option<Arc<dyn Installer>> {
        self.installers.get(language).cloned()
    }
}

/// Failure of a build, kept so every waiter sees the same error.
#[derive(Debug, Clone)]
struct BuildFailure {
    source: String,
    message: String,
}

impl From<BuildFailure> for Error {
    fn from(failure: BuildFailure) -> Self {
        Self::environment(failure.source, failure.message)
    }
}

type BuildCell = Arc<OnceCell<std::result::Result<Arc<Environment>, BuildFailure>>>;

/// Run-scoped environment cache with per-key single-flight builds.
#[derive(Debug)]
pub struct EnvironmentCache {
    store: EnvironmentStore,
    installers: InstallerRegistry,
    cells: Mutex<HashMap<EnvironmentKey, BuildCell>>,
}

impl EnvironmentCache {
    /// Cache backed by `store`.
    #[must_use]
    pub fn new(store: EnvironmentStore, installers: InstallerRegistry) -> Self {
        Self {
            store,
            installers,
            cells: Mutex::new(HashMap::new()),
        }
    }

    fn cell(&self, key: &EnvironmentKey) -> Result<BuildCell> {
        // Held only long enough to fetch or insert the cell
        let mut cells = self
            .cells
            .lock()
            .map_err(|_| Error::environment(&key.source, "environment cache lock poisoned"))?;
        Ok(Arc::clone(cells.entry(key.clone()).or_default()))
    }

    /// Get the environment for `key`, building it if needed.
    ///
    /// Concurrent callers for the same key wait for one build and receive
    /// the same instance, or the same error. A failed build is not retried
    /// within the run. Cancellation aborts the wait (and the build, when
    /// this caller is the one running it).
    pub async fn get(
        &self,
        key: &EnvironmentKey,
        source_root: &Path,
        cancel: &CancellationToken,
    ) -> Result<Arc<Environment>> {
        let cell = self.cell(key)?;
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = cell.get_or_init(|| self.build(key, source_root)) => outcome,
        };
        outcome.clone().map_err(Error::from)
    }

    #[instrument(name = "environment_build", skip_all, fields(language = %key.language))]
    async fn build(
        &self,
        key: &EnvironmentKey,
        source_root: &Path,
    ) -> std::result::Result<Arc<Environment>, BuildFailure> {
        let started = Instant::now();
        let fail = |message: String| BuildFailure {
            source: key.source.clone(),
            message,
        };

        let (digest, envelope) = key.digest().map_err(|e| fail(e.to_string()))?;

        let Some(installer) = self.installers.get(&key.language) else {
            let message = format!("unsupported language '{}'", key.language);
            emit_environment_failed!(digest, message);
            return Err(fail(message));
        };

        let result = self
            .build_with(installer.as_ref(), key, &digest, envelope, source_root)
            .await;

        match result {
            Ok((env, cached)) => {
                emit_environment_ready!(
                    digest,
                    cached,
                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
                );
                Ok(Arc::new(env))
            }
            Err(e) => {
                let message = match e {
                    Error::Environment { message, .. } => message,
                    other => other.to_string(),
                };
                emit_environment_failed!(digest, message);
                Err(fail(message))
            }
        }
    }

    async fn build_with(
        &self,
        installer: &dyn Installer,
        key: &EnvironmentKey,
        digest: &str,
        envelope: serde_json::Value,
        source_root: &Path,
    ) -> Result<(Environment, bool)> {
        let environment = |path: PathBuf| {
            let activation = installer.activate(InstallRequest {
                key,
                env_dir: &path,
                source_root,
            });
            Environment {
                key: key.clone(),
                digest: digest.to_string(),
                path,
                activation,
            }
        };

        if let Some(stored) = self.store.lookup(digest) {
            debug!(key = digest, "Reusing stored environment");
            return Ok((environment(stored.path), true));
        }

        let lock = self.store.lock(digest).await?;
        // Another process may have finished the build while we waited
        if let Some(stored) = self.store.lookup(digest) {
            return Ok((environment(stored.path), true));
        }

        emit_environment_building!(digest, key.language, key.source);
        let started = Instant::now();
        let env_dir = self.store.begin_build(digest, &lock)?;
        installer
            .install(InstallRequest {
                key,
                env_dir: &env_dir,
                source_root,
            })
            .await?;

        let stored = self.store.commit(
            EnvironmentRecord {
                key: digest.to_string(),
                envelope,
                language: key.language.clone(),
                created_at: Utc::now(),
                build_duration_ms: u64::try_from(started.elapsed().as_millis())
                    .unwrap_or(u64::MAX),
                hookrun_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            &lock,
        )?;
        Ok((environment(stored.path), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Slow installer that counts its builds.
    struct CountingInstaller {
        builds: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Installer for CountingInstaller {
        fn language(&self) -> &'static str {
            "counting"
        }

        async fn install(&self, request: InstallRequest<'_>) -> Result<()> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail {
                return Err(Error::environment(&request.key.source, "toolchain missing"));
            }
            std::fs::write(request.env_dir.join("ready"), b"ok").unwrap();
            Ok(())
        }

        fn activate(&self, request: InstallRequest<'_>) -> Activation {
            Activation {
                path_prefix: vec![request.env_dir.join("bin")],
                ..Activation::default()
            }
        }
    }

    fn cache(tmp: &TempDir, fail: bool) -> (Arc<EnvironmentCache>, Arc<AtomicUsize>) {
        let builds = Arc::new(AtomicUsize::new(0));
        let mut installers = InstallerRegistry::with_defaults();
        installers.register(Arc::new(CountingInstaller {
            builds: Arc::clone(&builds),
            fail,
        }));
        let cache = EnvironmentCache::new(EnvironmentStore::new(tmp.path()), installers);
        (Arc::new(cache), builds)
    }

    fn key(language: &str, deps: &[&str]) -> EnvironmentKey {
        EnvironmentKey::new(
            "../shared",
            "v1",
            language,
            "default",
            deps.iter().map(|d| (*d).to_string()).collect(),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_share_one_build() {
        let tmp = TempDir::new().unwrap();
        let (cache, builds) = cache(&tmp, false);
        let cancel = CancellationToken::new();
        let root = tmp.path().to_path_buf();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let cancel = cancel.clone();
            let root = root.clone();
            handles.push(tokio::spawn(async move {
                cache.get(&key("counting", &[]), &root, &cancel).await
            }));
        }

        let mut envs = Vec::new();
        for handle in handles {
            envs.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        for env in &envs[1..] {
            assert!(Arc::ptr_eq(&envs[0], env));
        }
        assert!(envs[0].path.join("ready").exists());
    }

    #[tokio::test]
    async fn test_failed_build_is_shared_and_not_retried() {
        let tmp = TempDir::new().unwrap();
        let (cache, builds) = cache(&tmp, true);
        let cancel = CancellationToken::new();

        let first = cache
            .get(&key("counting", &[]), tmp.path(), &cancel)
            .await
            .unwrap_err();
        let second = cache
            .get(&key("counting", &[]), tmp.path(), &cancel)
            .await
            .unwrap_err();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(matches!(first, Error::Environment { .. }));
        assert_eq!(first.to_string(), second.to_string());
        assert!(first.to_string().contains("toolchain missing"));
    }

    #[tokio::test]
    async fn test_environment_is_reused_across_runs() {
        let tmp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();

        let (first_run, builds) = cache(&tmp, false);
        first_run
            .get(&key("counting", &[]), tmp.path(), &cancel)
            .await
            .unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        let (second_run, builds) = cache(&tmp, false);
        let env = second_run
            .get(&key("counting", &[]), tmp.path(), &cancel)
            .await
            .unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 0);
        assert_eq!(env.activation.path_prefix, vec![env.path.join("bin")]);
    }

    #[tokio::test]
    async fn test_distinct_keys_build_separately() {
        let tmp = TempDir::new().unwrap();
        let (cache, builds) = cache(&tmp, false);
        let cancel = CancellationToken::new();

        let a = cache
            .get(&key("counting", &[]), tmp.path(), &cancel)
            .await
            .unwrap();
        let b = cache
            .get(&key("counting", &["extra"]), tmp.path(), &cancel)
            .await
            .unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_ne!(a.digest, b.digest);
    }

    #[tokio::test]
    async fn test_unknown_language_errors() {
        let tmp = TempDir::new().unwrap();
        let (cache, _) = cache(&tmp, false);
        let err = cache
            .get(&key("cobol", &[]), tmp.path(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported language 'cobol'"));
    }

    #[tokio::test]
    async fn test_builtin_installers_reject_dependencies() {
        let tmp = TempDir::new().unwrap();
        let (cache, _) = cache(&tmp, false);
        let err = cache
            .get(&key("system", &["requests"]), tmp.path(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not support additional_dependencies"));
    }

    #[tokio::test]
    async fn test_script_environment_resolves_entries_in_source() {
        let tmp = TempDir::new().unwrap();
        let (cache, _) = cache(&tmp, false);
        let source_root = tmp.path().join("hooks-src");
        let env = cache
            .get(&key("script", &[]), &source_root, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(env.activation.entry_root.as_deref(), Some(source_root.as_path()));
    }

    #[tokio::test]
    async fn test_cancelled_wait_returns_cancelled() {
        let tmp = TempDir::new().unwrap();
        let (cache, builds) = cache(&tmp, false);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = cache
            .get(&key("counting", &[]), tmp.path(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_key_sorts_dependencies() {
        assert_eq!(key("x", &["b", "a"]), key("x", &["a", "b", "b"]));
    }
}
