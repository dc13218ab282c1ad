//! Hook sources: where hook definitions come from
//!
//! A manifest refers to each source by a location string and a pinned
//! revision. Sources are resolved exactly once, while the manifest is
//! loaded, through the [`SourceProvider`] registered for the location.
//! Fetching remote repositories is left to external tooling: hookrun only
//! reads sources that already exist on disk.

use crate::manifest::ManifestEntry;
use crate::types::HookDefinition;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Location reference for hooks declared inline in the manifest.
pub const LOCAL_SOURCE: &str = "local";

/// File listing the hooks a path source publishes.
pub const DEFINITIONS_FILE: &str = ".hookrun-hooks.yaml";

/// A resolved hook source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSource {
    /// Stable identity used in environment keys
    pub identity: String,
    /// Pinned revision (empty for local hooks)
    pub revision: String,
    /// Directory script entries are resolved against
    pub root: PathBuf,
    /// Hooks the source publishes
    pub definitions: Vec<HookDefinition>,
}

impl HookSource {
    /// Whether this source holds inline manifest hooks.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.identity == LOCAL_SOURCE
    }

    /// Look up a published hook by id.
    #[must_use]
    pub fn definition(&self, id: &str) -> Option<&HookDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }
}

/// Everything a provider needs to resolve one manifest `repos` entry.
#[derive(Debug, Clone, Copy)]
pub struct SourceRequest<'a> {
    /// Location reference as written in the manifest
    pub location: &'a str,
    /// Pinned revision, if any
    pub revision: Option<&'a str>,
    /// Directory holding the manifest
    pub project_root: &'a Path,
    /// Hook entries of the block (the definitions themselves for `local`)
    pub entries: &'a [ManifestEntry],
}

/// Resolves location references of one kind into hook sources.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Whether this provider understands the location
    fn handles(&self, location: &str) -> bool;

    /// Resolve the location at its pinned revision
    async fn resolve(&self, request: SourceRequest<'_>) -> Result<HookSource>;
}

/// Hooks declared inline under `repo: local`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSourceProvider;

#[async_trait]
impl SourceProvider for LocalSourceProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn handles(&self, location: &str) -> bool {
        location == LOCAL_SOURCE
    }

    async fn resolve(&self, request: SourceRequest<'_>) -> Result<HookSource> {
        Ok(HookSource {
            identity: LOCAL_SOURCE.to_string(),
            revision: String::new(),
            root: request.project_root.to_path_buf(),
            definitions: request
                .entries
                .iter()
                .map(ManifestEntry::to_definition)
                .collect(),
        })
    }
}

/// A directory on disk (plain path or `file://` URL) publishing
/// [`DEFINITIONS_FILE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PathSourceProvider;

impl PathSourceProvider {
    fn directory(location: &str, project_root: &Path) -> PathBuf {
        let raw = location.strip_prefix("file://").unwrap_or(location);
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_root.join(path)
        }
    }
}

#[async_trait]
impl SourceProvider for PathSourceProvider {
    fn name(&self) -> &'static str {
        "path"
    }

    fn handles(&self, location: &str) -> bool {
        if location == LOCAL_SOURCE || location.is_empty() {
            return false;
        }
        location.starts_with("file://") || !(location.contains("://") || location.starts_with("git@"))
    }

    async fn resolve(&self, request: SourceRequest<'_>) -> Result<HookSource> {
        let dir = Self::directory(request.location, request.project_root);
        let root = tokio::fs::canonicalize(&dir).await.map_err(|_| {
            Error::configuration(format!(
                "hook source directory '{}' does not exist",
                dir.display()
            ))
        })?;

        let definitions_path = root.join(DEFINITIONS_FILE);
        let contents = tokio::fs::read_to_string(&definitions_path)
            .await
            .map_err(|_| {
                Error::configuration(format!(
                    "hook source '{}' has no {DEFINITIONS_FILE}",
                    request.location
                ))
            })?;
        let definitions: Vec<HookDefinition> =
            serde_yaml::from_str(&contents).map_err(|e| {
                Error::configuration(format!(
                    "invalid {} in '{}': {e}",
                    DEFINITIONS_FILE, request.location
                ))
            })?;

        debug!(
            source = %root.display(),
            hooks = definitions.len(),
            "Resolved path hook source"
        );

        Ok(HookSource {
            identity: root.display().to_string(),
            revision: request.revision.unwrap_or_default().to_string(),
            root,
            definitions,
        })
    }
}

/// Ordered set of source providers; the first one handling a location wins.
#[derive(Clone)]
pub struct SourceRegistry {
    providers: Vec<Arc<dyn SourceProvider>>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SourceRegistry {
    /// Registry without any provider
    #[must_use]
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registry with the local and path providers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(LocalSourceProvider));
        registry.register(Arc::new(PathSourceProvider));
        registry
    }

    /// Add a provider after the existing ones
    pub fn register(&mut self, provider: Arc<dyn SourceProvider>) {
        self.providers.push(provider);
    }

    /// Resolve a manifest `repos` entry.
    pub async fn resolve(&self, request: SourceRequest<'_>) -> Result<HookSource> {
        let Some(provider) = self.providers.iter().find(|p| p.handles(request.location)) else {
            return Err(Error::configuration(format!(
                "unsupported hook source '{}': fetch the source externally and reference it by path",
                request.location
            )));
        };
        provider.resolve(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request<'a>(location: &'a str, root: &'a Path) -> SourceRequest<'a> {
        SourceRequest {
            location,
            revision: Some("v1.0.0"),
            project_root: root,
            entries: &[],
        }
    }

    #[test]
    fn test_path_provider_location_matching() {
        let provider = PathSourceProvider;
        assert!(provider.handles("../shared-hooks"));
        assert!(provider.handles("/opt/hooks"));
        assert!(provider.handles("file:///opt/hooks"));
        assert!(!provider.handles("local"));
        assert!(!provider.handles("https://github.com/org/hooks"));
        assert!(!provider.handles("git@github.com:org/hooks.git"));
    }

    #[tokio::test]
    async fn test_path_source_reads_definitions() {
        let tmp = TempDir::new().unwrap();
        let source_dir = tmp.path().join("shared");
        std::fs::create_dir_all(&source_dir).unwrap();
        std::fs::write(
            source_dir.join(DEFINITIONS_FILE),
            "- id: trailing-whitespace\n  entry: ./fix.sh\n  language: script\n",
        )
        .unwrap();

        let registry = SourceRegistry::with_defaults();
        let source = registry
            .resolve(request("shared", tmp.path()))
            .await
            .unwrap();

        assert_eq!(source.revision, "v1.0.0");
        assert!(!source.is_local());
        assert!(source.definition("trailing-whitespace").is_some());
        assert!(source.definition("missing").is_none());
    }

    #[tokio::test]
    async fn test_file_url_resolves_same_identity_as_path() {
        let tmp = TempDir::new().unwrap();
        let source_dir = tmp.path().join("shared");
        std::fs::create_dir_all(&source_dir).unwrap();
        std::fs::write(source_dir.join(DEFINITIONS_FILE), "[]\n").unwrap();

        let registry = SourceRegistry::with_defaults();
        let by_path = registry
            .resolve(request("shared", tmp.path()))
            .await
            .unwrap();
        let url = format!("file://{}", source_dir.display());
        let by_url = registry.resolve(request(&url, tmp.path())).await.unwrap();
        assert_eq!(by_path.identity, by_url.identity);
    }

    #[tokio::test]
    async fn test_missing_source_directory() {
        let tmp = TempDir::new().unwrap();
        let err = SourceRegistry::with_defaults()
            .resolve(request("nowhere", tmp.path()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_remote_sources_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = SourceRegistry::with_defaults()
            .resolve(request("https://github.com/org/hooks", tmp.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("reference it by path"));
    }
}
