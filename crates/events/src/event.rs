//! Event type definitions for structured hookrun events.
//!
//! Events are categorized by domain (run, hook, environment, system, output)
//! and carry the metadata needed to correlate them across one invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A structured hookrun event with full metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookrunEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// Correlation ID for tracing across one invocation.
    pub correlation_id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Source information for the event.
    pub source: EventSource,
    /// The event category and data.
    pub category: EventCategory,
}

impl HookrunEvent {
    /// Create a new event with the given category.
    #[must_use]
    pub fn new(correlation_id: Uuid, source: EventSource, category: EventCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id,
            timestamp: Utc::now(),
            source,
            category,
        }
    }

    /// Whether the event carries detail that only verbose observers want.
    #[must_use]
    pub const fn is_detail(&self) -> bool {
        matches!(
            self.category,
            EventCategory::Environment(_) | EventCategory::Hook(HookEvent::Batch { .. })
        )
    }
}

/// Source information for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSource {
    /// The tracing target (e.g. "`hookrun::hook`").
    pub target: String,
    /// Source file path, if available.
    pub file: Option<String>,
    /// Source line number, if available.
    pub line: Option<u32>,
}

impl EventSource {
    /// Create a new event source with just a target.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            file: None,
            line: None,
        }
    }

    /// Create a new event source with file and line information.
    #[must_use]
    pub fn with_location(target: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            target: target.into(),
            file: Some(file.into()),
            line: Some(line),
        }
    }
}

/// Event categories organized by domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventCategory {
    /// Whole-run lifecycle events.
    Run(RunEvent),
    /// Per-hook lifecycle events.
    Hook(HookEvent),
    /// Environment preparation events.
    Environment(EnvironmentEvent),
    /// System events (signals, shutdown).
    System(SystemEvent),
    /// Generic output events.
    Output(OutputEvent),
}

/// Whole-run lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RunEvent {
    /// A run started.
    Started {
        /// Number of hooks planned for this run.
        hook_count: usize,
        /// Number of candidate files after global filtering.
        file_count: usize,
    },
    /// A run finished and its verdict is known.
    Completed {
        /// Whether the overall verdict is pass.
        success: bool,
        /// Process exit code derived from the verdict.
        exit_code: i32,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
    },
}

/// Per-hook lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum HookEvent {
    /// A hook started executing.
    Started {
        /// Hook identifier.
        hook_id: String,
        /// Display name.
        name: String,
        /// Number of files passed to the hook.
        file_count: usize,
    },
    /// One batch of a chunked invocation started.
    Batch {
        /// Hook identifier.
        hook_id: String,
        /// One-based batch number.
        batch: usize,
        /// Total number of batches.
        total: usize,
        /// Files in this batch.
        file_count: usize,
    },
    /// A hook finished executing.
    Completed {
        /// Hook identifier.
        hook_id: String,
        /// Outcome status (`passed`, `failed`, `errored`).
        status: String,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Duration in milliseconds.
        duration_ms: u64,
        /// Whether the hook changed files on disk.
        files_modified: bool,
    },
    /// A hook was not executed.
    Skipped {
        /// Hook identifier.
        hook_id: String,
        /// Why the hook did not run.
        reason: String,
    },
}

/// Environment preparation events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum EnvironmentEvent {
    /// An environment build started.
    Building {
        /// Content-hash key of the environment.
        key: String,
        /// Language of the environment.
        language: String,
        /// Hook source the environment belongs to.
        source: String,
    },
    /// An environment is ready for use.
    Ready {
        /// Content-hash key of the environment.
        key: String,
        /// Whether it was reused from the persistent store.
        cached: bool,
        /// Preparation time in milliseconds.
        duration_ms: u64,
    },
    /// An environment build failed.
    Failed {
        /// Content-hash key of the environment.
        key: String,
        /// Failure description.
        error: String,
    },
}

/// System events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SystemEvent {
    /// The run is being cancelled.
    Cancelled {
        /// What triggered the cancellation.
        reason: String,
    },
    /// System is shutting down.
    Shutdown,
}

/// Generic output events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutputEvent {
    /// Standard output.
    Stdout {
        /// Content to output.
        content: String,
    },
    /// Standard error.
    Stderr {
        /// Content to output.
        content: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = HookrunEvent::new(
            Uuid::new_v4(),
            EventSource::new("hookrun::test"),
            EventCategory::Output(OutputEvent::Stdout {
                content: "test".to_string(),
            }),
        );

        assert!(!event.id.is_nil());
        assert_eq!(event.source.target, "hookrun::test");
    }

    #[test]
    fn test_event_serialization() {
        let event = HookrunEvent::new(
            Uuid::new_v4(),
            EventSource::new("hookrun::hook"),
            EventCategory::Hook(HookEvent::Started {
                hook_id: "black".to_string(),
                name: "Format Python".to_string(),
                file_count: 3,
            }),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Hook\""));
        assert!(json.contains("\"event\":\"Started\""));
        assert!(json.contains("\"hook_id\":\"black\""));

        let parsed: HookrunEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, event.id);
    }

    #[test]
    fn test_event_source_with_location() {
        let source = EventSource::with_location("hookrun::run", "src/engine.rs", 42);
        assert_eq!(source.file.as_deref(), Some("src/engine.rs"));
        assert_eq!(source.line, Some(42));
    }

    #[test]
    fn test_detail_classification() {
        let batch = HookrunEvent::new(
            Uuid::new_v4(),
            EventSource::new("hookrun::hook"),
            EventCategory::Hook(HookEvent::Batch {
                hook_id: "ruff".to_string(),
                batch: 1,
                total: 2,
                file_count: 10,
            }),
        );
        assert!(batch.is_detail());

        let env = HookrunEvent::new(
            Uuid::new_v4(),
            EventSource::new("hookrun::environment"),
            EventCategory::Environment(EnvironmentEvent::Ready {
                key: "abc".to_string(),
                cached: true,
                duration_ms: 1,
            }),
        );
        assert!(env.is_detail());

        let skipped = HookrunEvent::new(
            Uuid::new_v4(),
            EventSource::new("hookrun::hook"),
            EventCategory::Hook(HookEvent::Skipped {
                hook_id: "mypy".to_string(),
                reason: "no files to check".to_string(),
            }),
        );
        assert!(!skipped.is_detail());
    }
}
