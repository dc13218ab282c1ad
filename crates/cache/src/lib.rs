//! Content-addressed store of prepared hook environments
//!
//! Environments are keyed by a hash of everything that determines their
//! contents:
//! - hook source and pinned revision
//! - language and language version
//! - additional dependencies (order-insensitive)
//! - platform and store format version
//!
//! A build is only visible to readers once its completion marker has been
//! committed, so an interrupted build is detected and redone on the next run.

#![expect(
    clippy::missing_errors_doc,
    reason = "Error documentation to be added incrementally"
)]

mod error;
pub mod store;

pub use error::{Error, Result};

pub use store::{
    BuildLock, EnvironmentKeyEnvelope, EnvironmentRecord, EnvironmentStore, MARKER_FILE,
    STORE_FORMAT_VERSION, StoredEnvironment, compute_environment_key, current_platform,
    default_cache_root,
};
