//! Structured event system for hookrun.
//!
//! Events are emitted with `tracing` macros under `hookrun::*` targets,
//! captured by [`HookrunEventLayer`], fanned out through an [`EventBus`]
//! and drawn by a renderer. The engine never prints directly; whoever owns
//! the terminal decides how (and whether) each event is shown.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hookrun_events::{EventBus, HookrunEventLayer, emit_hook_started};
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! let bus = EventBus::new();
//! let layer = HookrunEventLayer::new(bus.sender().into_inner());
//! tracing_subscriber::registry().with(layer).init();
//!
//! emit_hook_started!("ruff", "Lint Python", 12_usize);
//! ```

pub mod bus;
pub mod event;
pub mod layer;
pub mod metadata;
pub mod renderers;

pub use bus::{EventBus, EventReceiver, EventSender};
pub use event::{
    EnvironmentEvent, EventCategory, EventSource, HookEvent, HookrunEvent, OutputEvent, RunEvent,
    SystemEvent,
};
pub use layer::HookrunEventLayer;
pub use metadata::{correlation_id, set_correlation_id};
pub use renderers::{CliRenderer, CliRendererConfig, JsonRenderer};

// ============================================================================
// Run Events
// ============================================================================

/// Emit a run started event.
#[macro_export]
macro_rules! emit_run_started {
    ($hook_count:expr, $file_count:expr) => {
        ::tracing::info!(
            target: "hookrun::run",
            event_type = "run.started",
            hook_count = $hook_count,
            file_count = $file_count,
        )
    };
}

/// Emit a run completed event.
#[macro_export]
macro_rules! emit_run_completed {
    ($success:expr, $exit_code:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "hookrun::run",
            event_type = "run.completed",
            success = $success,
            exit_code = $exit_code,
            duration_ms = $duration_ms,
        )
    };
}

// ============================================================================
// Hook Events
// ============================================================================

/// Emit a hook started event.
#[macro_export]
macro_rules! emit_hook_started {
    ($hook_id:expr, $name:expr, $file_count:expr) => {
        ::tracing::info!(
            target: "hookrun::hook",
            event_type = "hook.started",
            hook_id = %$hook_id,
            name = %$name,
            file_count = $file_count,
        )
    };
}

/// Emit a hook batch event (verbose detail).
#[macro_export]
macro_rules! emit_hook_batch {
    ($hook_id:expr, $batch:expr, $total:expr, $file_count:expr) => {
        ::tracing::debug!(
            target: "hookrun::hook",
            event_type = "hook.batch",
            hook_id = %$hook_id,
            batch = $batch,
            total = $total,
            file_count = $file_count,
        )
    };
}

/// Emit a hook completed event.
#[macro_export]
macro_rules! emit_hook_completed {
    ($hook_id:expr, $status:expr, $exit_code:expr, $duration_ms:expr, $files_modified:expr) => {
        match $exit_code {
            Some(code) => ::tracing::info!(
                target: "hookrun::hook",
                event_type = "hook.completed",
                hook_id = %$hook_id,
                status = %$status,
                exit_code = code,
                duration_ms = $duration_ms,
                files_modified = $files_modified,
            ),
            None => ::tracing::info!(
                target: "hookrun::hook",
                event_type = "hook.completed",
                hook_id = %$hook_id,
                status = %$status,
                duration_ms = $duration_ms,
                files_modified = $files_modified,
            ),
        }
    };
}

/// Emit a hook skipped event.
#[macro_export]
macro_rules! emit_hook_skipped {
    ($hook_id:expr, $reason:expr) => {
        ::tracing::info!(
            target: "hookrun::hook",
            event_type = "hook.skipped",
            hook_id = %$hook_id,
            reason = %$reason,
        )
    };
}

// ============================================================================
// Environment Events
// ============================================================================

/// Emit an environment building event (verbose detail).
#[macro_export]
macro_rules! emit_environment_building {
    ($key:expr, $language:expr, $source:expr) => {
        ::tracing::debug!(
            target: "hookrun::environment",
            event_type = "environment.building",
            key = %$key,
            language = %$language,
            source = %$source,
        )
    };
}

/// Emit an environment ready event (verbose detail).
#[macro_export]
macro_rules! emit_environment_ready {
    ($key:expr, $cached:expr, $duration_ms:expr) => {
        ::tracing::debug!(
            target: "hookrun::environment",
            event_type = "environment.ready",
            key = %$key,
            cached = $cached,
            duration_ms = $duration_ms,
        )
    };
}

/// Emit an environment failed event.
#[macro_export]
macro_rules! emit_environment_failed {
    ($key:expr, $error:expr) => {
        ::tracing::warn!(
            target: "hookrun::environment",
            event_type = "environment.failed",
            key = %$key,
            error = %$error,
        )
    };
}

// ============================================================================
// System Events
// ============================================================================

/// Emit a cancellation event.
#[macro_export]
macro_rules! emit_cancelled {
    ($reason:expr) => {
        ::tracing::warn!(
            target: "hookrun::system",
            event_type = "system.cancelled",
            reason = %$reason,
        )
    };
}

/// Emit a shutdown event.
#[macro_export]
macro_rules! emit_shutdown {
    () => {
        ::tracing::info!(target: "hookrun::system", event_type = "system.shutdown",)
    };
}

// ============================================================================
// Output Events
// ============================================================================

/// Emit stdout content.
#[macro_export]
macro_rules! emit_stdout {
    ($content:expr) => {
        ::tracing::info!(
            target: "hookrun::output",
            event_type = "output.stdout",
            content = %$content,
        )
    };
}

/// Emit stderr content.
#[macro_export]
macro_rules! emit_stderr {
    ($content:expr) => {
        ::tracing::info!(
            target: "hookrun::output",
            event_type = "output.stderr",
            content = %$content,
        )
    };
}
