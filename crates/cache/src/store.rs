//! Persistent, content-addressed store of prepared hook environments
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/envs/<key>/                   environment directory
//! <root>/envs/<key>/.hookrun-env.json  completion marker (EnvironmentRecord)
//! <root>/locks/<key>.lock              cross-process build lock
//! ```
//!
//! A directory without a readable marker is a leftover of an interrupted
//! build and is wiped before the next build of that key.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use dirs::{cache_dir, home_dir};
use fs4::tokio::AsyncFileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the completion marker inside an environment directory.
pub const MARKER_FILE: &str = ".hookrun-env.json";

/// Bump when the on-disk layout of an environment changes.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Everything that determines the identity of a prepared environment.
///
/// Two hooks whose envelopes serialize identically share one environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EnvironmentKeyEnvelope {
    /// Hook source identity (location reference).
    pub source: String,
    /// Pinned revision of the source.
    pub revision: String,
    /// Language / runtime of the environment.
    pub language: String,
    /// Requested runtime version (`default` when unpinned).
    pub language_version: String,
    /// Extra packages installed into the environment, sorted.
    pub dependencies: Vec<String>,
    /// Platform identifier, environments are never shared across platforms.
    pub platform: String,
    /// Store format version.
    pub format: u32,
}

impl EnvironmentKeyEnvelope {
    /// Build an envelope for the current platform; dependencies are sorted
    /// and de-duplicated so their declaration order does not matter.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        revision: impl Into<String>,
        language: impl Into<String>,
        language_version: impl Into<String>,
        mut dependencies: Vec<String>,
    ) -> Self {
        dependencies.sort();
        dependencies.dedup();
        Self {
            source: source.into(),
            revision: revision.into(),
            language: language.into(),
            language_version: language_version.into(),
            dependencies,
            platform: current_platform(),
            format: STORE_FORMAT_VERSION,
        }
    }
}

/// Platform identifier used in keys, e.g. `linux-x86_64`.
#[must_use]
pub fn current_platform() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Compute the content-hash key of an envelope.
///
/// Returns the hex SHA-256 of the canonical JSON encoding together with the
/// encoded value (kept in the marker for debugging).
pub fn compute_environment_key(
    envelope: &EnvironmentKeyEnvelope,
) -> Result<(String, serde_json::Value)> {
    let json = serde_json::to_value(envelope)
        .map_err(|e| Error::serialization(format!("Failed to encode envelope: {e}")))?;
    let bytes = serde_json::to_vec(&json)
        .map_err(|e| Error::serialization(format!("Failed to serialize envelope: {e}")))?;
    let digest = Sha256::digest(bytes);
    Ok((hex::encode(digest), json))
}

/// Completion marker written after a successful build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    /// Content-hash key.
    pub key: String,
    /// Envelope the key was computed from.
    pub envelope: serde_json::Value,
    /// Language of the environment.
    pub language: String,
    /// When the build finished.
    pub created_at: DateTime<Utc>,
    /// Build duration in milliseconds.
    pub build_duration_ms: u64,
    /// hookrun version that built the environment.
    pub hookrun_version: String,
}

/// A completed environment found in the store.
#[derive(Debug, Clone)]
pub struct StoredEnvironment {
    /// Directory holding the environment.
    pub path: PathBuf,
    /// Its completion marker.
    pub record: EnvironmentRecord,
}

/// Inputs for determining the cache root directory
#[derive(Debug, Clone)]
struct CacheInputs {
    hookrun_cache_dir: Option<PathBuf>,
    xdg_cache_home: Option<PathBuf>,
    os_cache_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    temp_dir: PathBuf,
}

fn cache_root_from_inputs(inputs: CacheInputs) -> Result<PathBuf> {
    // First writable candidate wins:
    // 1) HOOKRUN_CACHE_DIR
    // 2) XDG_CACHE_HOME/hookrun
    // 3) OS cache dir/hookrun
    // 4) ~/.hookrun/cache
    // 5) TMPDIR/hookrun/cache
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(dir) = inputs
        .hookrun_cache_dir
        .filter(|p| !p.as_os_str().is_empty())
    {
        candidates.push(dir);
    }
    if let Some(xdg) = inputs.xdg_cache_home {
        candidates.push(xdg.join("hookrun"));
    }
    if let Some(os_cache) = inputs.os_cache_dir {
        candidates.push(os_cache.join("hookrun"));
    }
    if let Some(home) = inputs.home_dir {
        candidates.push(home.join(".hookrun/cache"));
    }
    candidates.push(inputs.temp_dir.join("hookrun/cache"));

    for path in candidates {
        // Read-only caches exist in some CI images; probe before trusting one
        if path.exists() {
            let probe = path.join(".write_probe");
            match fs::OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&probe)
            {
                Ok(_) => {
                    let _ = fs::remove_file(&probe);
                    return Ok(path);
                }
                Err(_) => continue,
            }
        }
        if fs::create_dir_all(&path).is_ok() {
            return Ok(path);
        }
    }
    Err(Error::configuration(
        "Failed to determine a writable cache directory",
    ))
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

/// Resolve the default cache root from the environment.
pub fn default_cache_root() -> Result<PathBuf> {
    cache_root_from_inputs(CacheInputs {
        hookrun_cache_dir: env_path("HOOKRUN_CACHE_DIR"),
        xdg_cache_home: env_path("XDG_CACHE_HOME"),
        os_cache_dir: cache_dir(),
        home_dir: home_dir(),
        temp_dir: std::env::temp_dir(),
    })
}

/// Exclusive cross-process lock on one environment key.
///
/// Released when dropped.
#[derive(Debug)]
pub struct BuildLock {
    _file: tokio::fs::File,
    path: PathBuf,
}

impl BuildLock {
    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// On-disk environment store.
#[derive(Debug, Clone)]
pub struct EnvironmentStore {
    root: PathBuf,
}

impl EnvironmentStore {
    /// Open a store rooted at `root`; directories are created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the store at the default cache root.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_cache_root()?))
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory an environment with `key` lives in.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join("envs").join(key)
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.root.join("locks").join(format!("{key}.lock"))
    }

    /// Look up a completed environment.
    ///
    /// Returns `None` when the directory or its marker is missing, unreadable,
    /// or records a different key.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<StoredEnvironment> {
        let path = self.path_for(key);
        let marker = path.join(MARKER_FILE);
        let bytes = fs::read(&marker).ok()?;
        match serde_json::from_slice::<EnvironmentRecord>(&bytes) {
            Ok(record) if record.key == key => Some(StoredEnvironment { path, record }),
            Ok(record) => {
                warn!(expected = key, found = %record.key, "Environment marker key mismatch");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Unreadable environment marker");
                None
            }
        }
    }

    /// Take the exclusive build lock for `key`, waiting for other processes.
    pub async fn lock(&self, key: &str) -> Result<BuildLock> {
        let path = self.lock_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(e, parent, "create_dir_all"))?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .await
            .map_err(|e| Error::io(e, &path, "open"))?;

        // Only one process builds a given key; the lock drops with the file
        file.lock_exclusive()
            .map_err(|e| Error::io(e, &path, "lock"))?;
        Ok(BuildLock { _file: file, path })
    }

    /// Prepare an empty directory for building `key`.
    ///
    /// Any leftover from an interrupted build is removed first. Callers must
    /// hold the [`BuildLock`] for the key.
    pub fn begin_build(&self, key: &str, _lock: &BuildLock) -> Result<PathBuf> {
        let path = self.path_for(key);
        if path.exists() {
            debug!(key, path = %path.display(), "Removing incomplete environment");
            fs::remove_dir_all(&path).map_err(|e| Error::io(e, &path, "remove_dir_all"))?;
        }
        fs::create_dir_all(&path).map_err(|e| Error::io(e, &path, "create_dir_all"))?;
        Ok(path)
    }

    /// Mark the environment for `record.key` as complete.
    ///
    /// The marker is written to a temporary file and renamed into place so a
    /// crash never leaves a half-written marker behind.
    pub fn commit(&self, record: EnvironmentRecord, _lock: &BuildLock) -> Result<StoredEnvironment> {
        let path = self.path_for(&record.key);
        let marker = path.join(MARKER_FILE);
        let temp = path.join(format!("{MARKER_FILE}.tmp"));
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| Error::serialization(format!("Failed to serialize marker: {e}")))?;
        fs::write(&temp, json).map_err(|e| Error::io(e, &temp, "write"))?;
        fs::rename(&temp, &marker).map_err(|e| Error::io(e, &marker, "rename"))?;
        debug!(key = %record.key, "Committed environment");
        Ok(StoredEnvironment { path, record })
    }

    /// List all completed environments.
    pub fn entries(&self) -> Result<Vec<StoredEnvironment>> {
        let envs = self.root.join("envs");
        if !envs.exists() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(&envs).map_err(|e| Error::io(e, &envs, "read_dir"))? {
            let entry = entry.map_err(|e| Error::io(e, &envs, "read_dir"))?;
            let name = entry.file_name();
            if let Some(stored) = name.to_str().and_then(|key| self.lookup(key)) {
                found.push(stored);
            }
        }
        found.sort_by(|a, b| a.record.key.cmp(&b.record.key));
        Ok(found)
    }

    /// Delete every environment and lock file. Returns how many environment
    /// directories were removed.
    pub fn clean(&self) -> Result<usize> {
        let envs = self.root.join("envs");
        let mut removed = 0;
        if envs.exists() {
            for entry in fs::read_dir(&envs).map_err(|e| Error::io(e, &envs, "read_dir"))? {
                let entry = entry.map_err(|e| Error::io(e, &envs, "read_dir"))?;
                let path = entry.path();
                fs::remove_dir_all(&path).map_err(|e| Error::io(e, &path, "remove_dir_all"))?;
                removed += 1;
            }
        }
        let locks = self.root.join("locks");
        if locks.exists() {
            fs::remove_dir_all(&locks).map_err(|e| Error::io(e, &locks, "remove_dir_all"))?;
        }
        info!(removed, root = %self.root.display(), "Cleaned environment store");
        Ok(removed)
    }
}
