//! Error types for the environment store

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for environment store operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Filesystem failure inside the store
    #[error("I/O {operation} failed: {}", path.display())]
    #[diagnostic(
        code(hookrun::cache::io),
        help("Check permissions on the cache directory, or point HOOKRUN_CACHE_DIR elsewhere")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error
        path: Box<Path>,
        /// Operation that failed (e.g., "read", "rename", "lock")
        operation: String,
    },

    /// No usable cache root, or a store task failed
    #[error("Environment store error: {message}")]
    #[diagnostic(code(hookrun::cache::config))]
    Configuration {
        /// What went wrong
        message: String,
    },

    /// Marker encoding failed
    #[error("Serialization error: {message}")]
    #[diagnostic(code(hookrun::cache::serialization))]
    Serialization {
        /// What went wrong
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: path.as_ref().into(),
            operation: operation.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }
}

/// Result type for environment store operations
pub type Result<T> = std::result::Result<T, Error>;
