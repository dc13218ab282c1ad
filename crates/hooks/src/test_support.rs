//! Builders shared by unit tests

use crate::environment::{Activation, Environment, EnvironmentKey};
use crate::manifest::ResolvedHook;
use crate::selector::FileFilter;
use crate::source::{HookSource, LOCAL_SOURCE};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// A `system` hook from the local source with default flags.
pub(crate) fn local_hook(index: usize, id: &str, command: &[&str]) -> ResolvedHook {
    ResolvedHook {
        index,
        id: id.to_string(),
        hook_id: id.to_string(),
        alias: None,
        name: id.to_string(),
        command: strings(command),
        language: "system".to_string(),
        language_version: "default".to_string(),
        args: Vec::new(),
        additional_dependencies: Vec::new(),
        filter: FileFilter::default(),
        stages: None,
        timeout: Duration::from_secs(30),
        always_run: false,
        pass_filenames: true,
        require_serial: false,
        fail_fast: false,
        modifies_files: false,
        verbose: false,
        source: Arc::new(HookSource {
            identity: LOCAL_SOURCE.to_string(),
            revision: String::new(),
            root: PathBuf::new(),
            definitions: Vec::new(),
        }),
    }
}

pub(crate) fn system_environment() -> Environment {
    Environment {
        key: EnvironmentKey::new(LOCAL_SOURCE, "", "system", "default", Vec::new()),
        digest: "test".to_string(),
        path: PathBuf::new(),
        activation: Activation::default(),
    }
}
