//! Tracing layer that turns `hookrun::*` events into [`HookrunEvent`]s.
//!
//! An event is captured when its target starts with `hookrun` and it carries
//! an `event_type` field naming one of the known event kinds. Everything
//! else passes through untouched for the regular log formatter.

// Field values come from our own emit macros
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::event::{
    EnvironmentEvent, EventCategory, EventSource, HookEvent, HookrunEvent, OutputEvent, RunEvent,
    SystemEvent,
};
use crate::metadata::correlation_id;
use tokio::sync::mpsc;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// A tracing layer that forwards hookrun events to a channel.
pub struct HookrunEventLayer {
    sender: mpsc::UnboundedSender<HookrunEvent>,
}

impl HookrunEventLayer {
    /// Create a new layer that sends events to the given channel.
    #[must_use]
    pub fn new(sender: mpsc::UnboundedSender<HookrunEvent>) -> Self {
        Self { sender }
    }
}

impl<S> Layer<S> for HookrunEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let target = meta.target();
        if !target.starts_with("hookrun") {
            return;
        }

        let mut visitor = EventVisitor::new(target);
        event.record(&mut visitor);

        if let Some(built) = visitor.build() {
            let _ = self.sender.send(built);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    target: String,
    event_type: Option<String>,

    hook_id: Option<String>,
    name: Option<String>,
    status: Option<String>,
    reason: Option<String>,
    exit_code: Option<i32>,
    duration_ms: Option<u64>,
    file_count: Option<usize>,
    hook_count: Option<usize>,
    batch: Option<usize>,
    total: Option<usize>,
    success: Option<bool>,
    files_modified: Option<bool>,

    key: Option<String>,
    language: Option<String>,
    source: Option<String>,
    cached: Option<bool>,
    error: Option<String>,

    content: Option<String>,
}

impl EventVisitor {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            ..Self::default()
        }
    }

    fn build(self) -> Option<HookrunEvent> {
        let event_type = self.event_type.as_deref()?;
        let source = EventSource::new(&self.target);

        let category = match event_type {
            "run.started" => EventCategory::Run(RunEvent::Started {
                hook_count: self.hook_count?,
                file_count: self.file_count.unwrap_or(0),
            }),
            "run.completed" => EventCategory::Run(RunEvent::Completed {
                success: self.success?,
                exit_code: self.exit_code?,
                duration_ms: self.duration_ms.unwrap_or(0),
            }),

            "hook.started" => EventCategory::Hook(HookEvent::Started {
                name: self.name.clone().or_else(|| self.hook_id.clone())?,
                hook_id: self.hook_id?,
                file_count: self.file_count.unwrap_or(0),
            }),
            "hook.batch" => EventCategory::Hook(HookEvent::Batch {
                hook_id: self.hook_id?,
                batch: self.batch?,
                total: self.total?,
                file_count: self.file_count.unwrap_or(0),
            }),
            "hook.completed" => EventCategory::Hook(HookEvent::Completed {
                hook_id: self.hook_id?,
                status: self.status?,
                exit_code: self.exit_code,
                duration_ms: self.duration_ms.unwrap_or(0),
                files_modified: self.files_modified.unwrap_or(false),
            }),
            "hook.skipped" => EventCategory::Hook(HookEvent::Skipped {
                hook_id: self.hook_id?,
                reason: self.reason?,
            }),

            "environment.building" => EventCategory::Environment(EnvironmentEvent::Building {
                key: self.key?,
                language: self.language?,
                source: self.source?,
            }),
            "environment.ready" => EventCategory::Environment(EnvironmentEvent::Ready {
                key: self.key?,
                cached: self.cached.unwrap_or(false),
                duration_ms: self.duration_ms.unwrap_or(0),
            }),
            "environment.failed" => EventCategory::Environment(EnvironmentEvent::Failed {
                key: self.key?,
                error: self.error?,
            }),

            "system.cancelled" => EventCategory::System(SystemEvent::Cancelled {
                reason: self.reason?,
            }),
            "system.shutdown" => EventCategory::System(SystemEvent::Shutdown),

            "output.stdout" => EventCategory::Output(OutputEvent::Stdout {
                content: self.content?,
            }),
            "output.stderr" => EventCategory::Output(OutputEvent::Stderr {
                content: self.content?,
            }),

            _ => return None,
        };

        Some(HookrunEvent::new(correlation_id(), source, category))
    }

    fn record_string(&mut self, field: &Field, value: String) {
        match field.name() {
            "event_type" => self.event_type = Some(value),
            "hook_id" => self.hook_id = Some(value),
            "name" => self.name = Some(value),
            "status" => self.status = Some(value),
            "reason" => self.reason = Some(value),
            "key" => self.key = Some(value),
            "language" => self.language = Some(value),
            "source" => self.source = Some(value),
            "error" => self.error = Some(value),
            "content" => self.content = Some(value),
            _ => {}
        }
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_string(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        match field.name() {
            "exit_code" => self.exit_code = Some(value as i32),
            "duration_ms" => self.duration_ms = Some(value as u64),
            "file_count" => self.file_count = Some(value as usize),
            "hook_count" => self.hook_count = Some(value as usize),
            "batch" => self.batch = Some(value as usize),
            "total" => self.total = Some(value as usize),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "exit_code" => self.exit_code = Some(value as i32),
            "duration_ms" => self.duration_ms = Some(value),
            "file_count" => self.file_count = Some(value as usize),
            "hook_count" => self.hook_count = Some(value as usize),
            "batch" => self.batch = Some(value as usize),
            "total" => self.total = Some(value as usize),
            _ => {}
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            "success" => self.success = Some(value),
            "files_modified" => self.files_modified = Some(value),
            "cached" => self.cached = Some(value),
            _ => {}
        }
    }

    // `%value` fields arrive here as Display wrappers
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_string(field, format!("{value:?}"));
    }
}
