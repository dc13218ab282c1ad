//! CLI renderer for hookrun events.
//!
//! Live progress goes to stderr so stdout stays reserved for the final
//! report. This module is allowed to print as it's the output layer.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use crate::bus::EventReceiver;
use crate::event::{
    EnvironmentEvent, EventCategory, HookEvent, HookrunEvent, OutputEvent, RunEvent, SystemEvent,
};
use std::io::{self, IsTerminal};

/// CLI renderer configuration.
#[derive(Debug, Clone)]
pub struct CliRendererConfig {
    /// Whether to use ANSI colors.
    pub colors: bool,
    /// Whether to show detail events (environment builds, batches).
    pub verbose: bool,
}

impl Default for CliRendererConfig {
    fn default() -> Self {
        Self {
            colors: io::stderr().is_terminal(),
            verbose: false,
        }
    }
}

/// CLI renderer that writes progress lines to stderr.
#[derive(Debug, Default)]
pub struct CliRenderer {
    config: CliRendererConfig,
}

impl CliRenderer {
    /// Create a new CLI renderer with the given configuration.
    #[must_use]
    pub fn with_config(config: CliRendererConfig) -> Self {
        Self { config }
    }

    /// Consume events until a shutdown event arrives or the bus closes.
    pub async fn run(self, mut receiver: EventReceiver) {
        while let Some(event) = receiver.recv().await {
            if matches!(event.category, EventCategory::System(SystemEvent::Shutdown)) {
                break;
            }
            self.render(&event);
        }
    }

    /// Render a single event.
    pub fn render(&self, event: &HookrunEvent) {
        match &event.category {
            EventCategory::Output(OutputEvent::Stdout { content }) => println!("{content}"),
            _ => {
                if let Some(line) = self.format(event) {
                    eprintln!("{line}");
                }
            }
        }
    }

    /// Format an event as a progress line, or `None` when it should stay hidden.
    #[must_use]
    pub fn format(&self, event: &HookrunEvent) -> Option<String> {
        if event.is_detail() && !self.config.verbose {
            return None;
        }
        match &event.category {
            EventCategory::Run(run) => self.format_run(run),
            EventCategory::Hook(hook) => Some(self.format_hook(hook)),
            EventCategory::Environment(env) => Some(format_environment(env)),
            EventCategory::System(SystemEvent::Cancelled { reason }) => {
                Some(self.paint(&format!("cancelling run: {reason}"), Tone::Bad))
            }
            EventCategory::System(SystemEvent::Shutdown) => None,
            EventCategory::Output(OutputEvent::Stdout { content }) => Some(content.clone()),
            EventCategory::Output(OutputEvent::Stderr { content }) => Some(content.clone()),
        }
    }

    fn format_run(&self, event: &RunEvent) -> Option<String> {
        match event {
            RunEvent::Started {
                hook_count,
                file_count,
            } => Some(format!(
                "Running {hook_count} hook(s) against {file_count} file(s)"
            )),
            RunEvent::Completed { duration_ms, .. } => {
                if self.config.verbose {
                    Some(format!("Run finished in {duration_ms}ms"))
                } else {
                    None
                }
            }
        }
    }

    fn format_hook(&self, event: &HookEvent) -> String {
        match event {
            HookEvent::Started {
                hook_id,
                name,
                file_count,
            } => {
                if name == hook_id {
                    format!("> [{hook_id}] started ({file_count} files)")
                } else {
                    format!("> [{hook_id}] {name} ({file_count} files)")
                }
            }
            HookEvent::Batch {
                hook_id,
                batch,
                total,
                file_count,
            } => format!("> [{hook_id}] batch {batch}/{total} ({file_count} files)"),
            HookEvent::Completed {
                hook_id,
                status,
                duration_ms,
                files_modified,
                ..
            } => {
                let tone = if status == "passed" { Tone::Good } else { Tone::Bad };
                let modified = if *files_modified { ", files modified" } else { "" };
                let line = format!("> [{hook_id}] {status} in {duration_ms}ms{modified}");
                self.paint(&line, tone)
            }
            HookEvent::Skipped { hook_id, reason } => {
                self.paint(&format!("> [{hook_id}] skipped: {reason}"), Tone::Muted)
            }
        }
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        if !self.config.colors {
            return text.to_string();
        }
        let code = match tone {
            Tone::Good => "32",
            Tone::Bad => "31",
            Tone::Muted => "33",
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn format_environment(event: &EnvironmentEvent) -> String {
    match event {
        EnvironmentEvent::Building {
            key,
            language,
            source,
        } => format!("  environment {} ({language}) for {source}: building", short(key)),
        EnvironmentEvent::Ready {
            key,
            cached,
            duration_ms,
        } => {
            let how = if *cached { "reused" } else { "built" };
            format!("  environment {}: {how} in {duration_ms}ms", short(key))
        }
        EnvironmentEvent::Failed { key, error } => {
            format!("  environment {}: failed: {error}", short(key))
        }
    }
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

#[derive(Clone, Copy)]
enum Tone {
    Good,
    Bad,
    Muted,
}
