//! Error types for the hookrun-hooks crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for hook engine operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Malformed or invalid manifest. Always raised before any hook runs.
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(hookrun_hooks::config::invalid),
        help("Fix the listed manifest entries and run `hookrun validate`")
    )]
    Configuration {
        /// Every problem found, one per line
        message: String,
    },

    /// A hook environment could not be prepared
    #[error("Environment for {source_id} could not be prepared: {message}")]
    #[diagnostic(code(hookrun_hooks::environment))]
    Environment {
        /// Hook source the environment belongs to
        source_id: String,
        /// What went wrong
        message: String,
    },

    /// A hook invocation could not be carried out
    #[error("Execution of '{hook_id}' failed: {message}")]
    #[diagnostic(code(hookrun_hooks::execution))]
    Execution {
        /// Effective hook id
        hook_id: String,
        /// What went wrong
        message: String,
    },

    /// Timeout error
    #[error("Operation timed out after {seconds} seconds")]
    #[diagnostic(code(hookrun_hooks::timeout))]
    Timeout {
        /// The number of seconds before the timeout occurred
        seconds: u64,
    },

    /// The run was cancelled
    #[error("Run cancelled")]
    #[diagnostic(code(hookrun_hooks::cancelled))]
    Cancelled,

    /// Outcomes do not line up with the planned hooks
    #[error("Internal error while aggregating outcomes: {message}")]
    #[diagnostic(
        code(hookrun_hooks::aggregation),
        help("This is a bug in hookrun; please report it with the manifest that triggered it")
    )]
    Aggregation {
        /// Which invariant broke
        message: String,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(hookrun_hooks::io::error))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<std::path::Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(hookrun_hooks::serialization))]
    Serialization {
        /// The error message describing the serialization issue
        message: String,
    },

    /// Environment store failure
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] hookrun_cache::Error),
}

impl Error {
    /// Create a configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an environment error attributed to a hook source
    pub fn environment(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Environment {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create an execution error for a hook
    pub fn execution(hook_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            hook_id: hook_id.into(),
            message: message.into(),
        }
    }

    /// Create an aggregation error
    pub fn aggregation(message: impl Into<String>) -> Self {
        Self::Aggregation {
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(|p| p.into_boxed_path()),
            operation: operation.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether this error is fatal for the whole run rather than one hook.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::Aggregation { .. } | Self::Store(_)
        )
    }
}

/// Result type for hook engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::environment("../shared", "unsupported language 'cobol'");
        assert_eq!(
            err.to_string(),
            "Environment for ../shared could not be prepared: unsupported language 'cobol'"
        );

        let err = Error::execution("ruff", "entry is empty");
        assert_eq!(err.to_string(), "Execution of 'ruff' failed: entry is empty");

        let err = Error::Timeout { seconds: 30 };
        assert_eq!(err.to_string(), "Operation timed out after 30 seconds");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::configuration("bad").is_fatal());
        assert!(Error::aggregation("missing outcome").is_fatal());
        assert!(!Error::environment("local", "x").is_fatal());
        assert!(!Error::Cancelled.is_fatal());
    }
}
