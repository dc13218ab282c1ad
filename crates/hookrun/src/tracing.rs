//! Tracing configuration for the hookrun CLI
//!
//! Two outputs share one subscriber: regular logs go through a `fmt` layer
//! gated by `--level`, and structured `hookrun::*` events are captured by
//! [`HookrunEventLayer`] for the progress renderers.

use crate::cli::CliError;
use hookrun_events::{EventBus, EventReceiver, HookrunEventLayer, correlation_id};
use std::io;
pub use tracing::Level;
use tracing_subscriber::{
    Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Tracing output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format
    Json,
    /// Development format with extra context
    Dev,
}

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above
    Info,
    /// Show warnings and above (default)
    Warn,
    /// Show errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl std::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "dev" => Ok(Self::Dev),
            _ => Err(format!("Unknown tracing format: {s}")),
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log line format
    pub format: TracingFormat,
    /// Minimum level of regular logs
    pub level: Level,
    /// Show file and line in the dev format
    pub enable_file_location: bool,
    /// Explicit filter directive, overriding `RUST_LOG` and `level`
    pub filter: Option<String>,
    /// Capture debug-level events (environment builds, batches) too
    pub detail_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Compact,
            level: Level::WARN,
            enable_file_location: true,
            filter: None,
            detail_events: false,
        }
    }
}

fn level_str(level: Level) -> String {
    level.as_str().to_ascii_lowercase()
}

fn log_filter(config: &TracingConfig) -> Result<EnvFilter, CliError> {
    if let Some(filter) = &config.filter {
        EnvFilter::try_new(filter)
    } else {
        EnvFilter::try_from_default_env().or_else(|_| {
            let level = level_str(config.level);
            // Structured events are drawn by the renderers, not the log formatter
            EnvFilter::try_new(format!(
                "hookrun={level},hookrun_hooks={level},hookrun_cache={level},hookrun_events={level},\
                 hookrun::run=off,hookrun::hook=off,hookrun::environment=off,\
                 hookrun::system=off,hookrun::output=off"
            ))
        })
    }
    .map_err(|e| CliError::config(format!("Failed to create tracing filter: {e}")))
}

fn fmt_layer<S>(config: &TracingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match config.format {
        TracingFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(io::stderr)
            .with_target(true)
            .boxed(),
        TracingFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_target(false)
            .boxed(),
        TracingFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        TracingFormat::Dev => tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_file(config.enable_file_location)
            .with_line_number(config.enable_file_location)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_level(true)
            .boxed(),
    }
}

/// Initialize tracing with log output plus structured event capture.
///
/// Returns the receiver the progress renderer consumes. Must be called
/// inside a tokio runtime.
pub fn init_tracing_with_events(config: &TracingConfig) -> Result<EventReceiver, CliError> {
    let bus = EventBus::new();
    let receiver = bus.subscribe();
    let sender = bus.sender();

    let event_level = if config.detail_events { "debug" } else { "info" };
    let event_filter = EnvFilter::try_new(format!("hookrun={event_level}"))
        .map_err(|e| CliError::config(format!("Failed to create event filter: {e}")))?;

    tracing_subscriber::registry()
        .with(fmt_layer(config).with_filter(log_filter(config)?))
        .with(HookrunEventLayer::new(sender.into_inner()).with_filter(event_filter))
        .try_init()
        .map_err(|e| CliError::other(format!("Failed to initialize tracing: {e}")))?;

    tracing::debug!(
        correlation_id = %correlation_id(),
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        detail_events = config.detail_events,
        "Tracing initialized with event capture"
    );
    Ok(receiver)
}

/// Create a new span for command execution with structured fields
#[macro_export]
macro_rules! command_span {
    ($command:expr) => {
        ::tracing::info_span!(
            "command",
            command = %$command,
            correlation_id = %::hookrun_events::correlation_id(),
            start_time = %::chrono::Utc::now().to_rfc3339(),
        )
    };
}
